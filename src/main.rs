#![forbid(unsafe_code)]

mod args;
mod auth;
mod constants;
mod dialog;
mod http;
mod jiotv;
mod logger;
mod menu;
mod player;
mod router;
mod settings;

use anyhow::Result;
use log::{debug, info};

use args::Args;
use auth::TokenManager;
use dialog::Terminal;
use http::Agent;
use jiotv::JioTv;
use logger::Logger;
use player::Player;
use router::{Action, Outcome, Params, Router};
use settings::Settings;

fn main() -> Result<()> {
    let args = Args::parse()?;

    Logger::init(args.debug)?;
    debug!("{args:?}");

    let params = Params::parse(&args.query);
    let action = Action::try_from(&params)?;

    let agent = Agent::new(&args.http)?;
    let settings = Settings::load(&args.settings_path)?;
    let jiotv = JioTv::new(
        agent.text(),
        TokenManager::new(settings, jiotv::SERVICE),
        args.jiotv.clone(),
    );

    let mut router = Router::new(jiotv, Terminal);
    match router.route(action)? {
        Outcome::Directory(directory) => print!("{directory}"),
        Outcome::Play { playback, title } => Player::play(&args.player, &playback, &title)?,
        Outcome::Notice(notice) => info!("{notice}"),
        Outcome::Text(text) => println!("{text}"),
    }

    Ok(())
}
