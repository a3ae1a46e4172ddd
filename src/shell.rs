//! Interactive text menu driving the listing loops.

use std::io::{self, Write};
use std::time::Duration;

use crate::client::DriveClient;
use crate::error::Result;
use crate::listing::{print_listing, timed_listing};

/// A recognized menu command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Time,
    List,
    Exit,
}

impl Command {
    /// Parse user input. Surrounding whitespace and case are ignored.
    pub fn parse(input: &str) -> Option<Self> {
        match input.trim().to_lowercase().as_str() {
            "time" => Some(Self::Time),
            "list" => Some(Self::List),
            "exit" => Some(Self::Exit),
            _ => None,
        }
    }
}

/// Clear the terminal between menu screens.
fn clear_screen() {
    print!("\x1B[2J\x1B[1;1H");
    let _ = io::stdout().flush();
}

fn print_menu() {
    println!("\n\nAvailable Commands:");
    println!(
        "{} \"time\" - fetch all files and time the whole operation",
        " ".repeat(10)
    );
    println!(
        "{} \"list\" - fetch all files and print file information to the console",
        " ".repeat(10)
    );
    println!("{} \"exit\" - quits the app\n", " ".repeat(10));
}

/// Print a prompt and read one line from stdin.
fn read_input(prompt: &str) -> Result<String> {
    print!("{}", prompt);
    io::stdout().flush()?;
    let mut line = String::new();
    io::stdin().read_line(&mut line)?;
    Ok(line)
}

fn wait_for_enter(prompt: &str) -> Result<()> {
    read_input(prompt)?;
    Ok(())
}

/// Run the menu loop until the user exits.
///
/// Errors from the listing loops propagate out and end the process.
pub async fn run(client: &DriveClient) -> Result<()> {
    loop {
        clear_screen();
        print_menu();

        let input = read_input("Enter a command: ")?;
        clear_screen();

        match Command::parse(&input) {
            Some(Command::Time) => {
                timed_listing(client).await?;
                wait_for_enter("\n\nPress ENTER to return to the menu ... ")?;
            }
            Some(Command::List) => {
                print_listing(client).await?;
                wait_for_enter("\n\nPress ENTER to return to the menu ... ")?;
            }
            Some(Command::Exit) => {
                println!("Thanks for using my app. I hope you have a great day!\n");
                println!(
                    "Merci d'utiliser mon application. J'espère que tu as passé une bonne journée!\n"
                );
                tokio::time::sleep(Duration::from_secs(1)).await;
                return Ok(());
            }
            None => {
                wait_for_enter(
                    "\nWARNING: Invalid command, please choose a command from the menu.\n\nPress ENTER to continue ... ",
                )?;
            }
        }
    }
}
