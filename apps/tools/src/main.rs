use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use shared::domain::{
    DestroyFilter, NewTutorial, Tutorial, TutorialChanges, TutorialFilter, TutorialId,
};
use storage::{Storage, TutorialStore};

#[derive(Parser, Debug)]
#[command(name = "tutorials-admin", about = "Maintenance commands for the tutorials database")]
struct Cli {
    #[arg(long, default_value = "sqlite://./data/tutorials.db")]
    database_url: String,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    List {
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        published: bool,
    },
    Create {
        title: String,
        #[arg(long)]
        description: Option<String>,
        #[arg(long)]
        published: bool,
    },
    Publish {
        id: i64,
    },
    Purge,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let storage = Storage::new(&cli.database_url).await?;

    match cli.command {
        Command::List { title, published } => {
            let filter = TutorialFilter {
                title_contains: title,
                published: published.then_some(true),
            };
            for tutorial in storage.find_all(filter).await? {
                print_tutorial(&tutorial);
            }
        }
        Command::Create {
            title,
            description,
            published,
        } => {
            if title.is_empty() {
                bail!("title can not be empty!");
            }
            let tutorial = storage
                .create(NewTutorial {
                    title,
                    description,
                    published,
                })
                .await?;
            println!("created id={}", tutorial.id);
        }
        Command::Publish { id } => {
            let changes = TutorialChanges {
                published: Some(true),
                ..TutorialChanges::default()
            };
            if storage.update(TutorialId(id), changes).await? == 0 {
                bail!("no tutorial with id={id}");
            }
            println!("published id={id}");
        }
        Command::Purge => {
            let removed = storage.destroy(DestroyFilter::All).await?;
            println!("removed {removed} tutorials");
        }
    }

    Ok(())
}

fn print_tutorial(tutorial: &Tutorial) {
    let state = if tutorial.published { "published" } else { "draft" };
    println!(
        "{:>5}  {:<9}  {}{}",
        tutorial.id.0,
        state,
        tutorial.title,
        tutorial
            .description
            .as_deref()
            .map(|d| format!(" - {d}"))
            .unwrap_or_default()
    );
}
