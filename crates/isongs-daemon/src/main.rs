mod command;

use command::Command;
use isongs_core::{ChannelListener, Config, InfoLoader, LoaderEvent};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{error, info, warn};

fn stamp() -> String {
    chrono::Local::now().format("%H:%M:%S").to_string()
}

fn report(loader: &InfoLoader, event: LoaderEvent) {
    match event {
        LoaderEvent::TrackChanged => match loader.current_song() {
            Some(song) => println!("{} now playing: {}", stamp(), song),
            None => println!("{} no song", stamp()),
        },
        LoaderEvent::RadioText(text) => {
            info!("Radio text: {}", text);
        }
        LoaderEvent::SongWritten(Ok(song)) => println!("{} saved: {}", stamp(), song),
        LoaderEvent::SongWritten(Err(e)) => {
            warn!("Save failed: {}", e);
            println!("{} save failed: {}", stamp(), e);
        }
        LoaderEvent::Error(e) => {
            println!("{} error: {}", stamp(), e);
        }
    }
}

fn status(loader: &InfoLoader) {
    let config = loader.config();
    println!(
        "running={} mode={:?} url={:?} save_path={:?}",
        loader.is_running(),
        config.loader.script_support,
        config.loader.url,
        config.loader.save_path
    );
    match loader.current_song() {
        Some(song) => println!("current: {}", song),
        None => println!("current: -"),
    }
    if let Some(text) = loader.radio_text() {
        println!("radio text: {}", text);
    }
}

#[tokio::main(flavor = "multi_thread", worker_threads = 2)]
async fn main() -> anyhow::Result<()> {
    let data_dir = isongs_core::platform::data_dir();
    std::fs::create_dir_all(&data_dir)?;
    let log_path = data_dir.join("isongs.log");

    let log_file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)?;

    let log_filter =
        std::env::var("RUST_LOG").unwrap_or_else(|_| "info,isongs_core=debug".to_string());
    tracing_subscriber::fmt()
        .with_writer(log_file)
        .with_env_filter(log_filter.as_str())
        .with_ansi(false)
        .init();

    eprintln!("isongs log: {}", log_path.display());

    let config = Config::load()?;
    info!("Config loaded from: {:?}", Config::config_path());

    let (listener, mut events) = ChannelListener::new();
    let loader = InfoLoader::new(config, Arc::new(listener));
    loader.start();
    eprintln!("{}", command::HELP);

    let mut stdin = BufReader::new(tokio::io::stdin()).lines();
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        tokio::select! {
            Some(event) = events.recv() => report(&loader, event),
            line = stdin.next_line() => {
                let Some(line) = line? else { break };
                match Command::parse(&line) {
                    Some(Command::Save) => {
                        // Completion arrives as a SongWritten event.
                        let _ = loader.save_song();
                    }
                    Some(Command::Reload) => match Config::load() {
                        Ok(config) => {
                            info!("Config reloaded");
                            loader.set_config(config);
                        }
                        Err(e) => {
                            error!("Failed to reload config: {}", e);
                            println!("{} reload failed: {}", stamp(), e);
                        }
                    },
                    Some(Command::Status) => status(&loader),
                    Some(Command::Quit) => break,
                    None if line.trim().is_empty() => {}
                    None => eprintln!("{}", command::HELP),
                }
            }
            _ = &mut ctrl_c => break,
        }
    }

    loader.stop();
    info!("isongs stopped");
    Ok(())
}
