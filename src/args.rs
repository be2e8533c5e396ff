use std::{
    collections::HashMap,
    env,
    ffi::OsString,
    fmt::Display,
    fs,
    path::{Path, PathBuf},
    process,
    str::FromStr,
};

use anyhow::{Context, Result, bail};
use log::debug;
use pico_args::{Arguments, Keys};

use crate::{
    constants, http::Args as HttpArgs, jiotv::Args as JioTvArgs, player::Args as PlayerArgs,
};

pub trait Parse {
    fn parse(&mut self, parser: &mut Parser) -> Result<()>;
}

#[derive(Default, Debug)]
pub struct Args {
    pub debug: bool,
    pub settings_path: PathBuf,
    pub query: String,
    pub http: HttpArgs,
    pub player: PlayerArgs,
    pub jiotv: JioTvArgs,
}

impl Parse for Args {
    fn parse(&mut self, parser: &mut Parser) -> Result<()> {
        parser.parse_switch_or(&mut self.debug, "-d", "--debug")?;
        self.http.parse(parser)?;
        self.player.parse(parser)?;
        self.jiotv.parse(parser)?;

        let mut settings_path = None;
        parser.parse_opt_string_cfg(&mut settings_path, "--settings", "settings")?;
        self.settings_path = match settings_path {
            Some(path) => path.into(),
            None => config_dir()
                .context("Failed to find config directory, use --settings")?
                .join(constants::DEFAULT_SETTINGS_PATH),
        };

        //Plugin URLs are accepted as-is, the router strips the base
        if let Some(query) = parser.parse_free::<String>()? {
            if query.starts_with('-') {
                bail!("Unknown argument: {query}");
            }
            self.query = query;
        }

        Ok(())
    }
}

impl Args {
    pub fn parse() -> Result<Self> {
        Self::parse_from(Arguments::from_env())
    }

    fn parse_from(mut raw: Arguments) -> Result<Self> {
        if raw.contains("-h") || raw.contains("--help") {
            print!(include_str!("usage"));
            process::exit(0);
        }

        if raw.contains("-V") || raw.contains("--version") {
            println!("{} {}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"));
            process::exit(0);
        }

        let config_path = raw.opt_value_from_str::<_, PathBuf>("-c")?;
        let config_path = match config_path {
            Some(path) => Some(path),
            None => raw.opt_value_from_str("--config")?,
        };

        let mut parser = Parser::new(raw, config_path.as_deref())?;
        let mut args = Self::default();
        args.parse(&mut parser)?;
        parser.finish()?;

        Ok(args)
    }
}

pub struct Parser {
    raw: Arguments,
    config: HashMap<String, String>,
}

impl Parser {
    fn new(raw: Arguments, config_path: Option<&Path>) -> Result<Self> {
        let config = match config_path {
            Some(path) => Self::read_config(path)
                .with_context(|| format!("Failed to read config file: {}", path.display()))?,
            None => match config_dir().map(|d| d.join(constants::DEFAULT_CONFIG_PATH)) {
                Some(path) if path.exists() => Self::read_config(&path)
                    .with_context(|| format!("Failed to read config file: {}", path.display()))?,
                _ => HashMap::default(),
            },
        };

        Ok(Self { raw, config })
    }

    fn read_config(path: &Path) -> Result<HashMap<String, String>> {
        debug!("Reading config file: {}", path.display());
        Self::parse_config(&fs::read_to_string(path)?)
    }

    fn parse_config(text: &str) -> Result<HashMap<String, String>> {
        let mut config = HashMap::new();
        for (number, line) in text.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let Some((key, value)) = line.split_once('=') else {
                bail!("Malformed config line {}: {line}", number + 1);
            };
            config.insert(key.trim().to_owned(), value.trim().to_owned());
        }

        Ok(config)
    }

    pub fn parse_switch(&mut self, dst: &mut bool, key: &'static str) -> Result<()> {
        if self.raw.contains(key) {
            *dst = true;
        }

        Ok(())
    }

    pub fn parse_switch_or(
        &mut self,
        dst: &mut bool,
        short: &'static str,
        long: &'static str,
    ) -> Result<()> {
        self.parse_switch(dst, short)?;
        self.parse_switch(dst, long)
    }

    pub fn parse_switch_cfg(
        &mut self,
        dst: &mut bool,
        key: &'static str,
        cfg_key: &str,
    ) -> Result<()> {
        if self.raw.contains(key) {
            *dst = true;
        } else if let Some(value) = self.config.get(cfg_key) {
            *dst = value
                .parse()
                .with_context(|| format!("Invalid value for {cfg_key} in config: {value}"))?;
        }

        Ok(())
    }

    pub fn parse_cfg<T>(&mut self, dst: &mut T, key: impl Into<Keys>, cfg_key: &str) -> Result<()>
    where
        T: FromStr,
        T::Err: Display,
    {
        if let Some(value) = self.raw.opt_value_from_str(key)? {
            *dst = value;
        } else if let Some(value) = self.config.get(cfg_key) {
            *dst = value
                .parse()
                .map_err(|e| anyhow::anyhow!("Invalid value for {cfg_key} in config: {e}"))?;
        }

        Ok(())
    }

    pub fn parse_fn_cfg<T>(
        &mut self,
        dst: &mut T,
        key: &'static str,
        cfg_key: &str,
        f: fn(&str) -> Result<T>,
    ) -> Result<()> {
        if let Some(value) = self.raw.opt_value_from_fn(key, f)? {
            *dst = value;
        } else if let Some(value) = self.config.get(cfg_key) {
            *dst = f(value).with_context(|| format!("Invalid value for {cfg_key} in config"))?;
        }

        Ok(())
    }

    pub fn parse_opt_string_cfg(
        &mut self,
        dst: &mut Option<String>,
        key: impl Into<Keys>,
        cfg_key: &str,
    ) -> Result<()> {
        if let Some(value) = self.raw.opt_value_from_str::<_, String>(key)? {
            *dst = Some(value);
        } else if let Some(value) = self.config.get(cfg_key) {
            *dst = Some(value.clone());
        }

        Ok(())
    }

    pub fn parse_free<T>(&mut self) -> Result<Option<T>>
    where
        T: FromStr,
        T::Err: Display,
    {
        Ok(self.raw.opt_free_from_str()?)
    }

    fn finish(self) -> Result<()> {
        let remaining: Vec<OsString> = self.raw.finish();
        if !remaining.is_empty() {
            bail!("Unknown arguments: {remaining:?}");
        }

        Ok(())
    }
}

pub fn config_dir() -> Option<PathBuf> {
    if cfg!(target_os = "windows") {
        return env::var_os("APPDATA").map(PathBuf::from);
    }

    env::var_os("XDG_CONFIG_HOME")
        .filter(|d| !d.is_empty())
        .map(PathBuf::from)
        .or_else(|| env::var_os("HOME").map(|h| PathBuf::from(h).join(".config")))
}
