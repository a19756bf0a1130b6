//! First-run initializer: creates the data directories, a demo board with a
//! welcome section and one greeting post. Safe to run against an existing
//! tree; anything already present is left alone.

use anyhow::Context;
use domains::{post_filename, ContentStore, Post, PostLocation, SessionUser};
use storage_adapters::{FsContentStore, FsUserStore};

const DEMO_BOARD: &str = "General";
const DEMO_SECTION: &str = "Welcome";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt().with_env_filter("info").init();

    let config = configs::AppConfig::load().context("loading configuration")?;
    let owner = config
        .auth
        .super_admins
        .first()
        .cloned()
        .unwrap_or_else(|| "admin".to_string());

    let content = FsContentStore::new(&config.storage.data_dir)
        .await
        .context("opening content store")?;
    // Opening the user store is enough to materialize its directory.
    FsUserStore::new(&config.storage.users_dir)
        .await
        .context("opening user store")?;

    if content.board_exists(DEMO_BOARD).await? {
        tracing::info!(board = DEMO_BOARD, "demo board already present, nothing to do");
        return Ok(());
    }

    content.create_board(DEMO_BOARD, &owner).await?;
    content.create_section(DEMO_BOARD, DEMO_SECTION).await?;

    let post = Post::publish(
        &SessionUser::new(&owner),
        "Welcome to corkboard".into(),
        "This board was created by the seed tool. Make yourself at home.".into(),
        vec!["welcome".into()],
    );
    let filename = post_filename(post.time);
    content
        .write_post(
            &PostLocation::new(DEMO_BOARD, DEMO_SECTION, filename.clone()),
            &post,
        )
        .await?;

    tracing::info!(
        board = DEMO_BOARD,
        section = DEMO_SECTION,
        filename,
        owner,
        "seeded demo content"
    );
    Ok(())
}
