use std::{
    borrow::Cow,
    path::Path,
    process::{Command, Stdio},
};

use anyhow::{Context, Result, ensure};
use log::{debug, info};

use crate::{
    args::{Parse, Parser},
    jiotv::playback::Playback,
};

#[derive(Clone, Debug)]
pub struct Args {
    path: Option<String>,
    pargs: Cow<'static, str>,
    quiet: bool,
}

impl Default for Args {
    fn default() -> Self {
        Self {
            pargs: "-".into(),
            path: Option::default(),
            quiet: bool::default(),
        }
    }
}

impl Parse for Args {
    fn parse(&mut self, parser: &mut Parser) -> Result<()> {
        parser.parse_opt_string_cfg(&mut self.path, ["-p", "--player"], "player")?;

        let mut pargs = None;
        parser.parse_opt_string_cfg(&mut pargs, ["-a", "--player-args"], "player-args")?;
        if let Some(pargs) = pargs {
            self.pargs = pargs.into();
        }

        parser.parse_switch_or(&mut self.quiet, "-q", "--quiet")?;

        Ok(())
    }
}

#[derive(Debug, PartialEq, Eq)]
enum Known {
    Mpv,
    Vlc,
    Other,
}

impl Known {
    fn from_path(path: &str) -> Self {
        let name = Path::new(path)
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or_default()
            .to_ascii_lowercase();

        match name.as_str() {
            "mpv" => Self::Mpv,
            "vlc" | "cvlc" => Self::Vlc,
            _ => Self::Other,
        }
    }
}

pub struct Player;

impl Player {
    //Prints the URL instead when no player is configured
    pub fn play(args: &Args, playback: &Playback, title: &str) -> Result<()> {
        let Some(path) = &args.path else {
            for (key, value) in playback.properties() {
                debug!("{key}={value}");
            }

            println!("{}", playback.url);
            return Ok(());
        };

        let pargs = Self::command_args(path, &args.pargs, playback, title);
        info!("Opening player: {path} {}", pargs.join(" "));

        let mut command = Command::new(path);
        command.args(&pargs).stdin(Stdio::null());
        if args.quiet {
            command.stdout(Stdio::null()).stderr(Stdio::null());
        }

        let status = command
            .spawn()
            .context("Failed to open player")?
            .wait()
            .context("Failed to wait for player process")?;

        ensure!(status.success(), "Player exited with {status}");
        Ok(())
    }

    fn command_args(path: &str, pargs: &str, playback: &Playback, title: &str) -> Vec<String> {
        let mut command_args = Vec::new();
        match Known::from_path(path) {
            Known::Mpv => {
                command_args.push(format!("--force-media-title={title}"));
                if let Some(max_bandwidth) = playback.max_bandwidth() {
                    command_args.push(format!("--hls-bitrate={max_bandwidth}"));
                }
            }
            Known::Vlc => {
                command_args.push(format!("--meta-title={title}"));
                if let Some(max_bandwidth) = playback.max_bandwidth() {
                    //kbit/s
                    command_args.push(format!("--adaptive-maxbw={}", max_bandwidth / 1000));
                }
            }
            Known::Other => (),
        }

        let mut substituted = false;
        for arg in pargs.split_whitespace() {
            if arg == "-" {
                command_args.push(playback.url.clone());
                substituted = true;
            } else {
                command_args.push(arg.to_owned());
            }
        }

        if !substituted {
            command_args.push(playback.url.clone());
        }

        command_args
    }
}
