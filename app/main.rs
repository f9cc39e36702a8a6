use std::{env::current_dir, path::PathBuf, process::ExitCode};

use clap::{error::ErrorKind, Parser, Subcommand};
use env_logger::Env;
use lib::{commit::Commit, object_store::Record, Error, Repository};

#[derive(Parser, Debug)]
#[command(name = "revlet", version, about = "a tiny revision control system")]
struct Arguments {
    #[arg(
        short = 'C',
        long,
        global = true,
        help = "run as if started in this directory"
    )]
    dir: Option<PathBuf>,
    #[clap(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    #[clap(about = "create a repository in the working directory")]
    Init,
    #[clap(about = "stage a file for the next commit")]
    Add { file: String },
    #[clap(about = "record the staged changes")]
    Commit {
        #[arg(help = "message to leave with this commit")]
        message: Option<String>,
    },
    #[clap(about = "unstage a file, or stop tracking and delete it")]
    Rm { file: String },
    #[clap(about = "show the history of the current branch")]
    Log,
    #[clap(about = "show every commit ever made")]
    GlobalLog,
    #[clap(about = "print the ids of commits with the given message")]
    Find { message: String },
    #[clap(about = "show branches, staged files, and working tree changes")]
    Status,
    #[clap(
        about = "restore a file, or switch branches",
        long_about = "checkout -- <file>: restore a file from the current commit\n\
                      checkout <commit> -- <file>: restore a file from a commit\n\
                      checkout <branch>: switch to a branch"
    )]
    Checkout {
        target: Option<String>,
        #[arg(last = true)]
        file: Option<String>,
    },
    #[clap(about = "create a branch at the current commit")]
    Branch { name: String },
    #[clap(about = "delete a branch pointer")]
    RmBranch { name: String },
    #[clap(about = "move the current branch to a commit")]
    Reset { commit: String },
    #[clap(about = "merge a branch into the current one")]
    Merge { branch: String },
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(Env::default().default_filter_or("warn")).init();
    let args = match Arguments::try_parse() {
        Ok(args) => args,
        Err(err) => return usage_error(err),
    };
    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            log::debug!("command failed: {:?}", err);
            println!("{}", err);
            ExitCode::FAILURE
        }
    }
}

fn usage_error(err: clap::Error) -> ExitCode {
    match err.kind() {
        ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => {
            let _ = err.print();
            return ExitCode::SUCCESS;
        }
        ErrorKind::InvalidSubcommand => println!("No command with that name exists."),
        ErrorKind::MissingSubcommand | ErrorKind::DisplayHelpOnMissingArgumentOrSubcommand => {
            println!("Please enter a command.")
        }
        _ => println!("{}", Error::IncorrectOperands),
    }
    ExitCode::FAILURE
}

fn run(args: Arguments) -> Result<(), Error> {
    let dir = match args.dir {
        Some(dir) => dir,
        None => current_dir()?,
    };
    if let Command::Init = args.cmd {
        Repository::init(&dir)?;
        return Ok(());
    }
    let mut repo = Repository::open(&dir)?;
    dispatch(&mut repo, args.cmd)?;
    repo.save()
}

fn dispatch(repo: &mut Repository, cmd: Command) -> Result<(), Error> {
    match cmd {
        Command::Init => return Err(Error::AlreadyInitialized),
        Command::Add { file } => repo.add(&file)?,
        Command::Commit { message } => {
            repo.commit(message.as_deref().unwrap_or(""))?;
        }
        Command::Rm { file } => repo.rm(&file)?,
        Command::Log => {
            for commit in repo.log() {
                print_commit(&commit?);
            }
        }
        Command::GlobalLog => {
            for commit in repo.global_log()? {
                print_commit(&commit);
            }
        }
        Command::Find { message } => {
            for id in repo.find(&message)? {
                println!("{}", id);
            }
        }
        Command::Status => print!("{}", repo.status()?),
        Command::Checkout { target, file } => match (target, file) {
            (None, Some(file)) => repo.checkout_file(&file)?,
            (Some(commit), Some(file)) => repo.checkout_file_from(&commit, &file)?,
            (Some(branch), None) => repo.checkout_branch(&branch)?,
            (None, None) => return Err(Error::IncorrectOperands),
        },
        Command::Branch { name } => repo.branch(&name)?,
        Command::RmBranch { name } => repo.rm_branch(&name)?,
        Command::Reset { commit } => repo.reset(&commit)?,
        Command::Merge { branch } => {
            if repo.merge(&branch)?.had_conflicts() {
                println!("Encountered a merge conflict.");
            }
        }
    }
    Ok(())
}

fn print_commit(commit: &Commit) {
    println!("===");
    println!("commit {}", commit.id());
    println!("Date: {}", commit.timestamp());
    println!("{}", commit.message());
    println!();
}
