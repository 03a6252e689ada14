//! `x264-recipe plan` command

use anyhow::{Context, Result};
use serde_json::json;

use super::Dirs;
use crate::cli::PlanArgs;
use x264_recipe::builder::plan::{resolve, EnvMode, ResolvedPlan};
use x264_recipe::core::settings::BuildRequest;
use x264_recipe::ops::build_request;
use x264_recipe::util::shell::Shell;

pub fn execute(args: PlanArgs, dirs: &Dirs, shell: &Shell) -> Result<()> {
    let ctx = dirs.context()?;
    let req = build_request(&ctx, &args.settings.to_options())?;
    let plan = resolve(&req);

    if args.json || shell.is_json() {
        let out = json!({
            "request": request_json(&req),
            "plan": plan,
        });
        let text = serde_json::to_string_pretty(&out).context("failed to serialize plan")?;
        println!("{}", text);
    } else {
        print!("{}", format_plan(&req, &plan));
    }

    Ok(())
}

fn request_json(req: &BuildRequest) -> serde_json::Value {
    json!({
        "os": req.platform.os_name(),
        "arch": req.arch,
        "compiler": req.compiler.name(),
        "compiler_version": req.compiler.version(),
        "runtime": req.compiler.msvc_runtime().map(|r| r.as_str()),
        "build_type": req.build_type,
        "shared": req.shared,
        "fpic": req.platform.fpic(),
        "bit_depth": req.bit_depth,
        "host": req.host,
    })
}

fn format_plan(req: &BuildRequest, plan: &ResolvedPlan) -> String {
    let mut out = String::new();

    out.push_str(&format!(
        "x264 for {} {} with {} ({})\n\n",
        req.platform, req.arch, req.compiler, req.build_type
    ));

    out.push_str("Configure arguments:\n");
    for arg in plan.configure_args() {
        out.push_str(&format!("  {}\n", arg));
    }

    out.push_str("\nEnvironment:\n");
    for (key, ov) in plan.env().iter() {
        let line = match ov.mode {
            EnvMode::PrependPath => format!("  {} (prepend) {}\n", key, ov.values.join(", ")),
            EnvMode::Replace => format!("  {}={}\n", key, ov.values.join(" ")),
            EnvMode::AppendFlags => format!("  {} (append) {}\n", key, ov.values.join(" ")),
        };
        out.push_str(&line);
    }

    out.push('\n');
    out.push_str(&format!(
        "Shell emulation: {}\n",
        if plan.needs_shell_emulation() { "required" } else { "not required" }
    ));
    out.push_str(&format!(
        "Install step:    {}\n",
        if plan.skip_install_step() { "skipped" } else { "run" }
    ));
    out
}
