use anyhow::Result;
use std::path::PathBuf;

#[derive(Debug, PartialEq, Clone)]
pub enum Command {
    List,
    Store(PathBuf),
    Load { name: String, dest: Option<PathBuf> },
    Delete(String),
    Info,
    Help,
    Exit,
}

impl Command {
    pub fn parse(line: &str) -> Result<Self> {
        let parts: Vec<&str> = line.split_whitespace().collect();
        if parts.is_empty() {
            return Err(anyhow::anyhow!("Empty command"));
        }

        let args = &parts[1..];
        let command = match (parts[0].to_lowercase().as_str(), args) {
            ("list" | "ls", []) => Command::List,
            ("store" | "put", [path]) => Command::Store(PathBuf::from(path)),
            ("load" | "get", [name]) => Command::Load {
                name: name.to_string(),
                dest: None,
            },
            ("load" | "get", [name, dest]) => Command::Load {
                name: name.to_string(),
                dest: Some(PathBuf::from(dest)),
            },
            ("delete" | "rm", [name]) => Command::Delete(name.to_string()),
            ("info", []) => Command::Info,
            ("help", _) => Command::Help,
            ("exit" | "quit", _) => Command::Exit,
            ("list" | "ls" | "store" | "put" | "load" | "get" | "delete" | "rm" | "info", _) => {
                return Err(anyhow::anyhow!("Wrong arguments for '{}', try 'help'", parts[0]))
            }
            _ => return Err(anyhow::anyhow!("Unknown command '{}'", parts[0])),
        };

        Ok(command)
    }
}

pub const HELP: &str = "\
list                  list stored files
store <path>          store a local file, prints the generated name
load <name> [dest]    show a stored file's size, or copy it to dest
delete <name>         delete a stored file
info                  show storage directory status
exit                  leave the console";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse() {
        assert_eq!(Command::parse("list").unwrap(), Command::List);
        assert_eq!(Command::parse("  LS ").unwrap(), Command::List);
        assert_eq!(
            Command::parse("store ./photo.jpg").unwrap(),
            Command::Store(PathBuf::from("./photo.jpg"))
        );
        assert_eq!(
            Command::parse("load abc.png").unwrap(),
            Command::Load { name: "abc.png".to_string(), dest: None }
        );
        assert_eq!(
            Command::parse("get abc.png /tmp/out.png").unwrap(),
            Command::Load {
                name: "abc.png".to_string(),
                dest: Some(PathBuf::from("/tmp/out.png")),
            }
        );
        assert_eq!(Command::parse("rm abc.png").unwrap(), Command::Delete("abc.png".to_string()));
        assert_eq!(Command::parse("info").unwrap(), Command::Info);
        assert_eq!(Command::parse("quit").unwrap(), Command::Exit);
    }

    #[test]
    fn test_parse_errors() {
        assert!(Command::parse("").is_err());
        assert!(Command::parse("frobnicate").is_err());
        assert!(Command::parse("store").is_err());
        assert!(Command::parse("delete a b").is_err());
        assert!(Command::parse("list extra").is_err());
    }
}
