//! Apply a write to a resource tree stored in a JSON file, running implicit scheduling along the way

use std::error::Error;
use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};

use caldav_courier::config::SchedulingSettings;
use caldav_courier::lifecycle::{Method, Request};
use caldav_courier::memory::{MemoryDirectory, MemoryTree};
use caldav_courier::utils::{print_report, print_tree};
use caldav_courier::{DavPath, DeliveryBroker, ScheduleAdapter};

#[derive(Parser)]
#[command(name = "courier")]
#[command(about = "Write calendar objects into a CalDAV tree, and deliver the scheduling messages they call for")]
struct Cli {
    /// The resource tree (JSON)
    #[arg(short, long)]
    tree: PathBuf,

    /// The principal directory (JSON). Without it, no recipient can be resolved
    #[arg(short, long)]
    directory: Option<PathBuf>,

    /// Scheduling settings (JSON)
    #[arg(short, long)]
    settings: Option<PathBuf>,

    /// The authenticated principal, e.g. "principals/user1"
    #[arg(short, long)]
    user: Option<String>,

    /// A calendar user address of the authenticated principal (may be repeated). Read from the directory otherwise
    #[arg(short, long = "address")]
    addresses: Vec<String>,

    /// Send the opt-out header, as a client would to disable server-side scheduling
    #[arg(long)]
    no_schedule: bool,

    /// Do not write anything into inboxes (as if scheduling was disabled on the server)
    #[arg(long)]
    no_delivery: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create or replace a calendar object
    Put {
        path: String,
        /// The iCalendar file to store
        #[arg(short, long)]
        file: PathBuf,
    },
    /// Delete a calendar object
    Delete {
        path: String,
    },
    /// Move a calendar object elsewhere
    Move {
        path: String,
        destination: String,
    },
    /// Print the content of the tree
    List {
        #[arg(default_value = "/")]
        path: String,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    env_logger::init();
    let cli = Cli::parse();

    let settings = match &cli.settings {
        None => SchedulingSettings::default(),
        Some(path) => SchedulingSettings::from_file(path)?,
    };
    let tree = Arc::new(MemoryTree::from_file(&cli.tree)?);

    let mut broker = DeliveryBroker::new(settings.clone());
    if let Some(path) = &cli.directory {
        broker = broker.with_directory(Arc::new(MemoryDirectory::from_file(path)?));
    }
    if cli.no_delivery == false {
        broker = broker.with_sink(tree.clone());
    }
    let adapter = ScheduleAdapter::new(tree.clone(), broker);

    let request = |method: Method| {
        let mut request = Request::new(method);
        if let Some(user) = &cli.user {
            request = request.with_principal(user.as_str());
        }
        if cli.addresses.is_empty() == false {
            request = request.with_addresses(&cli.addresses);
        }
        if cli.no_schedule {
            request = request.with_header(&settings.opt_out_header, &settings.opt_out_value);
        }
        request
    };

    match &cli.command {
        Commands::Put { path, file } => {
            let path = DavPath::new(path);
            let mut content = std::fs::read_to_string(file)?;
            let mut modified = false;
            let report = match tree.object(path.clone()) {
                None => adapter.before_create(&request(Method::Put), &path, &mut content, &mut modified).await,
                Some(_) => adapter.before_write(&request(Method::Put), &path, &mut content, &mut modified).await,
            };
            tree.put_object(path.clone(), &content)?;

            print_report(&report);
            if modified {
                println!("{}", content);
            }
        },
        Commands::Delete { path } => {
            let path = DavPath::new(path);
            let report = adapter.before_unbind(&request(Method::Delete), &path).await;
            if tree.delete(path.clone()) == false {
                return Err(format!("{} does not exist", path).into());
            }
            print_report(&report);
        },
        Commands::Move { path, destination } => {
            let path = DavPath::new(path);
            let destination = DavPath::new(destination);
            let content = tree.object(path.clone()).ok_or_else(|| format!("{} does not exist", path))?;

            let report = adapter.before_unbind(&request(Method::Move), &path).await;
            tree.put_object(destination, &content)?;
            tree.delete(path);
            print_report(&report);
        },
        Commands::List { path } => {
            print_tree(&tree, &DavPath::new(path));
        },
    }

    tree.save_to_file(&cli.tree)?;
    Ok(())
}
