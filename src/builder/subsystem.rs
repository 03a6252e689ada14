//! POSIX subsystems used to run autotools scripts on Windows hosts.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::util::process::find_bash;

/// A POSIX layer that can run `configure` on Windows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Subsystem {
    #[default]
    Cygwin,
    Msys2,
}

impl Subsystem {
    pub fn as_str(&self) -> &'static str {
        match self {
            Subsystem::Cygwin => "cygwin",
            Subsystem::Msys2 => "msys2",
        }
    }

    /// Translate a native Windows path into the form this subsystem's
    /// shell understands.
    ///
    /// `C:\pkg\out` becomes `/cygdrive/c/pkg/out` under Cygwin and
    /// `/c/pkg/out` under MSYS2. Paths without a drive letter only get their
    /// separators flipped.
    pub fn unix_path(&self, path: &Path) -> String {
        let raw = path.to_string_lossy().replace('\\', "/");
        let mut chars = raw.chars();

        match (chars.next(), chars.next()) {
            (Some(drive), Some(':')) if drive.is_ascii_alphabetic() => {
                let rest = &raw[2..];
                let drive = drive.to_ascii_lowercase();
                let prefix = match self {
                    Subsystem::Cygwin => format!("/cygdrive/{}", drive),
                    Subsystem::Msys2 => format!("/{}", drive),
                };
                if rest.is_empty() || rest == "/" {
                    prefix
                } else {
                    format!("{}{}", prefix, rest)
                }
            }
            _ => raw,
        }
    }
}

impl FromStr for Subsystem {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "cygwin" => Ok(Subsystem::Cygwin),
            "msys2" | "msys" => Ok(Subsystem::Msys2),
            _ => Err(format!(
                "invalid subsystem '{}'; expected 'cygwin' or 'msys2'",
                s
            )),
        }
    }
}

impl fmt::Display for Subsystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Locate the bash executable for a shell-emulated build.
///
/// A configured Cygwin `bin` directory wins over whatever is on PATH.
pub fn locate_bash(cygwin_bin: Option<&Path>) -> Option<PathBuf> {
    if let Some(bin) = cygwin_bin {
        let candidate = bin.join(if cfg!(windows) { "bash.exe" } else { "bash" });
        if candidate.exists() {
            return Some(candidate);
        }
        tracing::warn!("no bash found in configured cygwin bin {}", bin.display());
    }
    find_bash()
}

/// Quote a word for a POSIX shell command line.
pub fn shell_quote(word: &str) -> String {
    let safe = !word.is_empty()
        && word
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "-_./=:,+@%".contains(c));
    if safe {
        word.to_string()
    } else {
        format!("'{}'", word.replace('\'', r"'\''"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unix_path_cygwin() {
        let p = Path::new(r"C:\Users\build\package");
        assert_eq!(
            Subsystem::Cygwin.unix_path(p),
            "/cygdrive/c/Users/build/package"
        );
    }

    #[test]
    fn test_unix_path_msys2() {
        let p = Path::new(r"D:\pkg");
        assert_eq!(Subsystem::Msys2.unix_path(p), "/d/pkg");
        assert_eq!(Subsystem::Msys2.unix_path(Path::new("E:")), "/e");
    }

    #[test]
    fn test_unix_path_without_drive() {
        let p = Path::new("/already/posix");
        assert_eq!(Subsystem::Cygwin.unix_path(p), "/already/posix");
        assert_eq!(Subsystem::Msys2.unix_path(Path::new(r"rel\dir")), "rel/dir");
    }

    #[test]
    fn test_subsystem_parse() {
        assert_eq!("Cygwin".parse::<Subsystem>().unwrap(), Subsystem::Cygwin);
        assert_eq!("msys".parse::<Subsystem>().unwrap(), Subsystem::Msys2);
        assert!("wsl".parse::<Subsystem>().is_err());
    }

    #[test]
    fn test_shell_quote() {
        assert_eq!(shell_quote("--enable-static"), "--enable-static");
        assert_eq!(shell_quote("--prefix=/c/my dir"), "'--prefix=/c/my dir'");
        assert_eq!(shell_quote("it's"), r"'it'\''s'");
        assert_eq!(shell_quote(""), "''");
    }
}
