//! peepin-admin CLI tool
//!
//! Manages profiles and live locations on a running Peepin node.
//!
//! Usage:
//!   peepin-admin add-user <id> <handle> <password> <name>
//!   peepin-admin set-password <user_id> <password>
//!   peepin-admin list-users
//!   peepin-admin set-sharing <user_id> <true|false>
//!   peepin-admin forget-location <user_id>
//!   peepin-admin prune
//!   peepin-admin stats
//!   peepin-admin ping

use peepin_node::admin_socket::{default_socket_path, AdminCommand, AdminResponse};
use std::io::{BufRead, BufReader, Write};
use std::os::unix::net::UnixStream;
use std::path::PathBuf;

fn print_usage() {
    eprintln!("peepin-admin - Manage Peepin node profiles and locations");
    eprintln!();
    eprintln!("Usage:");
    eprintln!("  peepin-admin add-user <id> <handle> <password> <name>  Create a profile");
    eprintln!("  peepin-admin set-password <user_id> <password>    Replace a login password");
    eprintln!("  peepin-admin list-users                           List all profiles");
    eprintln!("  peepin-admin set-sharing <user_id> <true|false>   Toggle location sharing");
    eprintln!("  peepin-admin forget-location <user_id>            Drop a live location");
    eprintln!("  peepin-admin prune                                Prune stale locations now");
    eprintln!("  peepin-admin stats                                Profile and location counts");
    eprintln!("  peepin-admin ping                                 Check if daemon is running");
    eprintln!();
    eprintln!("Environment:");
    eprintln!("  PEEPIN_SOCKET  Path to admin socket (default: $PEEPIN_DATA_DIR/admin.sock)");
}

fn get_socket_path() -> PathBuf {
    std::env::var("PEEPIN_SOCKET")
        .or_else(|_| std::env::var("PEEPIN_ADMIN_SOCKET"))
        .map(PathBuf::from)
        .unwrap_or_else(|_| default_socket_path())
}

fn send_command(cmd: AdminCommand) -> Result<AdminResponse, String> {
    let socket_path = get_socket_path();

    let mut stream = UnixStream::connect(&socket_path).map_err(|e| {
        format!(
            "Failed to connect to peepin-node at {:?}: {}\n\
             Is the peepin-node running?",
            socket_path, e
        )
    })?;

    // Send command
    let cmd_json = serde_json::to_string(&cmd).map_err(|e| e.to_string())?;
    writeln!(stream, "{}", cmd_json).map_err(|e| e.to_string())?;

    // Read response
    let mut reader = BufReader::new(&stream);
    let mut response_line = String::new();
    reader
        .read_line(&mut response_line)
        .map_err(|e| e.to_string())?;

    serde_json::from_str(&response_line).map_err(|e| format!("Invalid response: {}", e))
}

fn fail(message: &str) -> ! {
    eprintln!("Error: {}", message);
    std::process::exit(1);
}

fn parse_command(args: &[String]) -> AdminCommand {
    match args[1].as_str() {
        "add-user" => {
            if args.len() < 6 {
                fail("add-user requires <id> <handle> <password> <name>");
            }
            AdminCommand::AddUser {
                id: args[2].clone(),
                handle: args[3].clone(),
                password: args[4].clone(),
                name: args[5..].join(" "),
            }
        }
        "set-password" => {
            if args.len() < 4 {
                fail("set-password requires <user_id> <password>");
            }
            AdminCommand::SetPassword {
                user_id: args[2].clone(),
                password: args[3].clone(),
            }
        }
        "list-users" => AdminCommand::ListUsers,
        "set-sharing" => {
            if args.len() < 4 {
                fail("set-sharing requires <user_id> <true|false>");
            }
            let share = match args[3].as_str() {
                "true" | "on" | "yes" => true,
                "false" | "off" | "no" => false,
                other => fail(&format!("expected true or false, got {}", other)),
            };
            AdminCommand::SetSharing {
                user_id: args[2].clone(),
                share,
            }
        }
        "forget-location" => {
            if args.len() < 3 {
                fail("forget-location requires a user_id argument");
            }
            AdminCommand::ForgetLocation {
                user_id: args[2].clone(),
            }
        }
        "prune" => AdminCommand::Prune,
        "stats" => AdminCommand::Stats,
        "ping" => AdminCommand::Ping,
        "-h" | "--help" | "help" => {
            print_usage();
            std::process::exit(0);
        }
        other => {
            eprintln!("Unknown command: {}", other);
            print_usage();
            std::process::exit(1);
        }
    }
}

fn main() {
    let args: Vec<String> = std::env::args().collect();

    if args.len() < 2 {
        print_usage();
        std::process::exit(1);
    }

    let cmd = parse_command(&args);

    match send_command(cmd) {
        Ok(response) => match response {
            AdminResponse::Ok { message } => {
                println!("{}", message);
            }
            AdminResponse::Error { error } => fail(&error),
            AdminResponse::List { items } => {
                if items.is_empty() {
                    println!("(none)");
                } else {
                    for item in items {
                        println!("{}", item);
                    }
                }
            }
            AdminResponse::Count { value } => {
                println!("Pruned {} stale locations", value);
            }
            AdminResponse::Stats { users, locations } => {
                println!("users: {}", users);
                println!("locations: {}", locations);
            }
            AdminResponse::Pong => {
                println!("pong - peepin-node is running");
            }
        },
        Err(e) => {
            eprintln!("{}", e);
            std::process::exit(1);
        }
    }
}
