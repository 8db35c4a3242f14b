use comments_client::{api::CommentId, delete_warning, render_forest, Store};
use tracing_subscriber::EnvFilter;

mod api;
use api::HttpRemote;

#[derive(structopt::StructOpt)]
struct Opt {
    /// Base url of the comments server
    #[structopt(short, long, env = "COMMENTS_HOST", default_value = "http://localhost:8000")]
    host: String,

    /// Time zone to show dates in
    #[structopt(long, env = "COMMENTS_TZ", default_value = "UTC")]
    timezone: chrono_tz::Tz,

    #[structopt(subcommand)]
    cmd: Command,
}

#[derive(structopt::StructOpt)]
enum Command {
    /// Show the whole thread
    List,

    /// Post a new top-level comment
    Add { text: String },

    /// Reply to a comment
    Reply { parent: i64, text: String },

    /// Change the text of a comment
    Edit { id: i64, text: String },

    /// Delete a comment and all its replies
    Delete { id: i64 },

    /// Delete every comment on the server
    Wipe,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let opt = <Opt as structopt::StructOpt>::from_args();
    tracing::debug!(host = %opt.host, "loading comment thread");

    let store = Store::new(HttpRemote::new(&opt.host));
    store.refresh().await?;

    match opt.cmd {
        Command::List => (),
        Command::Add { text } => {
            let id = store.add_root(&text).await?;
            eprintln!("posted comment #{id}");
        }
        Command::Reply { parent, text } => {
            let id = store.add_reply(CommentId(parent), &text).await?;
            eprintln!("posted reply #{id} to #{parent}");
        }
        Command::Edit { id, text } => {
            store.edit_node(CommentId(id), &text).await?;
            eprintln!("updated comment #{id}");
        }
        Command::Delete { id } => {
            let id = CommentId(id);
            if let Some(warning) = store.with_forest(|f| f.find(id).map(delete_warning)) {
                eprintln!("{warning}");
            }
            store.delete_node(id).await?;
            eprintln!("deleted comment #{id}");
        }
        Command::Wipe => {
            let deleted = store.remote().wipe().await?;
            eprintln!("deleted {deleted} comments");
            store.refresh().await?;
        }
    }

    print!("{}", render_forest(&store.forest(), &opt.timezone));
    Ok(())
}
