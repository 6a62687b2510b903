use std::fs;
use std::io::{self, Write};
use anyhow::{Context, Result};
use crate::cli::command::{Command, HELP};
use crate::file::LocalFileStore;

pub fn run(store: &LocalFileStore) -> Result<()> {
    println!("Welcome to the upload store console");
    println!("Storing files in {}", store.root().display());
    println!("Type 'help' for commands or 'exit' to quit");

    let stdin = io::stdin();
    loop {
        print!("> ");
        io::stdout().flush()?;

        let mut input = String::new();
        if stdin.read_line(&mut input)? == 0 {
            break;
        }

        let input = input.trim();
        if input.is_empty() {
            continue;
        }

        match Command::parse(input) {
            Ok(Command::Exit) => break,
            Ok(command) => {
                if let Err(e) = execute(store, command) {
                    println!("Error: {:#}", e);
                }
            }
            Err(e) => println!("Error: {}", e),
        }
    }

    println!("Goodbye!");
    Ok(())
}

fn execute(store: &LocalFileStore, command: Command) -> Result<()> {
    match command {
        Command::List => {
            let mut names = store.list();
            names.sort();
            for name in &names {
                println!("{}", name);
            }
            println!("{} file(s)", names.len());
        }
        Command::Store(path) => {
            let source = fs::File::open(&path)
                .with_context(|| format!("Failed to open {}", path.display()))?;
            let original = path.file_name().and_then(|n| n.to_str());
            let name = store.store_from_reader(source, original)?;
            println!("{}", name);
        }
        Command::Load { name, dest } => match store.load(&name) {
            None => println!("Not found: {}", name),
            Some(file) => match dest {
                None => println!("{} ({} bytes)", file.path().display(), file.len()?),
                Some(dest) => {
                    let mut out = fs::File::create(&dest)
                        .with_context(|| format!("Failed to create {}", dest.display()))?;
                    let copied = io::copy(&mut file.open()?, &mut out)?;
                    println!("Copied {} bytes to {}", copied, dest.display());
                }
            },
        },
        Command::Delete(name) => store.delete(&name),
        Command::Info => println!("{}", store.storage_info()),
        Command::Help => println!("{}", HELP),
        Command::Exit => {}
    }

    Ok(())
}
