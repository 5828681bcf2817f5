#![forbid(unsafe_code)]

use anyhow::{Result, anyhow};
use log::{info, error, LevelFilter};
use serde::Deserialize;
use std::{env, fs, path::Path};
use fs_mistrust::Mistrust;
use std::os::unix::fs::PermissionsExt;
use lazy_static::lazy_static;
use structopt::StructOpt;

use log4rs::append::console::{ConsoleAppender, Target};
use log4rs::config::{Appender, Config as LogConfig, Root};
use log4rs::encode::pattern::PatternEncoder;

// Saludo Utilities
use crate::client::handler::HandlerSettings;
use crate::client::response_format::ResponseFormatKind;
use crate::utils::{saludo_utils, errors::Errors};

use super::saludo_utils::get_absolute_path;

// ***************************************************************************
//                                Constants
// ***************************************************************************
// Directory and file locations. Unless otherwise noted, all files and directories
// are relative to the root directory.
const ENV_SALUDO_ROOT_DIR  : &str = "SALUDO_ROOT_DIR";
const DEFAULT_ROOT_DIR     : &str = "~/.saludo";
const CONFIG_DIR           : &str = "/config";
const LOGS_DIR             : &str = "/logs";
const LOG4RS_CONFIG_FILE   : &str = "/log4rs.yml";   // relative to config dir
const SALUDO_CONFIG_FILE   : &str = "/saludo.toml";  // relative to config dir

// Networking.
const DEFAULT_BASE_URL     : &str = "http://localhost:35000";
const DEFAULT_ENDPOINT     : &str = "/api/saludo";

// Used when no log4rs file is installed.
const DEFAULT_LOG_PATTERN  : &str = "{d(%Y-%m-%dT%H:%M:%S%.3f)} {h({l})} {t} - {m}{n}";

// ***************************************************************************
//                             Static Variables
// ***************************************************************************
// Assign the command line arguments once for the whole process.
lazy_static! {
    pub static ref SALUDO_ARGS: SaludoArgs = init_saludo_args();
}

// ***************************************************************************
//                             Directory Structs
// ***************************************************************************
// ---------------------------------------------------------------------------
// SaludoDirs:
// ---------------------------------------------------------------------------
#[derive(Debug, Clone)]
pub struct SaludoDirs {
    pub root_dir: String,
    pub config_dir: String,
    pub logs_dir: String,
}

// ***************************************************************************
//                               Config Structs
// ***************************************************************************
// ---------------------------------------------------------------------------
// SaludoArgs:
// ---------------------------------------------------------------------------
#[derive(Debug, StructOpt)]
#[structopt(name = "saludo_client", about = "Send a name to the greeting endpoint and show the reply.")]
pub struct SaludoArgs {
    /// Specify the client's root data directory.
    ///
    /// The root directory is calculated using the following priority order:
    ///
    ///   1. If set, the value of the SALUDO_ROOT_DIR environment,
    ///
    ///   2. Otherwise, if set, the value of the --root-dir command line argument,
    ///
    ///   3. Otherwise, ~/.saludo
    ///
    #[structopt(short, long)]
    pub root_dir: Option<String>,

    /// Create the data directories and then exit.
    #[structopt(short, long)]
    pub create_dirs_only: bool,

    /// Send a single request for this name and exit.
    ///
    /// Without this option names are read from stdin, one per line.
    #[structopt(short, long)]
    pub name: Option<String>,

    /// Greeting server address, overrides base_url in saludo.toml.
    #[structopt(short, long)]
    pub base_url: Option<String>,

    /// Response format (json or text), overrides response_format in saludo.toml.
    #[structopt(short, long)]
    pub format: Option<ResponseFormatKind>,
}

// ---------------------------------------------------------------------------
// Parms:
// ---------------------------------------------------------------------------
#[derive(Debug)]
pub struct Parms {
    pub config_file: String,
    pub config: Config,
}

// ---------------------------------------------------------------------------
// RuntimeCtx:
// ---------------------------------------------------------------------------
#[derive(Debug)]
pub struct RuntimeCtx {
    pub parms: Parms,
    pub saludo_args: &'static SaludoArgs,
    pub saludo_dirs: SaludoDirs,
}

// ---------------------------------------------------------------------------
// Config:
// ---------------------------------------------------------------------------
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Config {
    pub title: String,
    pub base_url: String,
    pub endpoint_path: String,
    pub response_format: ResponseFormatKind,
}

impl Config {
    pub fn new() -> Self {
        Config::default()
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            title: "Saludo Client".to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
            endpoint_path: DEFAULT_ENDPOINT.to_string(),
            response_format: ResponseFormatKind::default(),
        }
    }
}

// ***************************************************************************
//                            Directory Functions
// ***************************************************************************
// ---------------------------------------------------------------------------
// init_saludo_args:
// ---------------------------------------------------------------------------
/** Get the command line arguments. */
fn init_saludo_args() -> SaludoArgs {
    SaludoArgs::from_args()
}

// ---------------------------------------------------------------------------
// init_saludo_dirs:
// ---------------------------------------------------------------------------
/** Calculate the external data directories, creating any that are missing. */
pub fn init_saludo_dirs(args: &SaludoArgs) -> Result<SaludoDirs> {
    let mistrust = get_mistrust()?;

    let root_dir = get_root_dir(args);
    check_saludo_dir(&root_dir, "root directory", &mistrust)?;

    let config_dir = root_dir.clone() + CONFIG_DIR;
    check_saludo_dir(&config_dir, "config directory", &mistrust)?;

    let logs_dir = root_dir.clone() + LOGS_DIR;
    check_saludo_dir(&logs_dir, "logs directory", &mistrust)?;

    Ok(SaludoDirs { root_dir, config_dir, logs_dir })
}

// ---------------------------------------------------------------------------
// check_saludo_dir:
// ---------------------------------------------------------------------------
/** Check that the path is absolute and, if it exists, that is has the proper
 * permissions assigned.  If it doesn't exist, create it.  The mistrust package
 * creates directories with 0o700 permissions.
 */
fn check_saludo_dir(dir: &str, msgname: &str, mistrust: &Mistrust) -> Result<()> {
    let path = Path::new(dir);
    if !path.is_absolute() {
        return Err(anyhow!(Errors::DataDirectory(dir.to_string(),
                           format!("the {} path must be absolute", msgname))));
    }

    if path.exists() {
        if !path.is_dir() {
            return Err(anyhow!(Errors::DataDirectory(dir.to_string(),
                               format!("the {} path must be a directory", msgname))));
        }

        // Make sure the directory has rwx for owner only.
        let perm = path.metadata()?.permissions().mode();
        if perm & 0o777 != 0o700 {
            return Err(anyhow!(Errors::DataDirectory(dir.to_string(),
                               format!("the {} path must have 0o700 permissions", msgname))));
        }
    } else if let Err(e) = mistrust.make_directory(path) {
        return Err(anyhow!(Errors::DataDirectory(dir.to_string(), e.to_string())));
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// get_mistrust:
// ---------------------------------------------------------------------------
/** Configure a new mistrust object for initial directory processing. */
fn get_mistrust() -> Result<Mistrust> {
    Mistrust::builder()
        .ignore_prefix(get_absolute_path("~"))
        .trust_group(0)
        .build()
        .map_err(|e| anyhow!("Mistrust configuration error: {}", e))
}

// ---------------------------------------------------------------------------
// get_root_dir:
// ---------------------------------------------------------------------------
fn get_root_dir(args: &SaludoArgs) -> String {
    // Order of precedence:
    //  1. Environment variable
    //  2. Command line --root-dir argument
    //  3. Default location
    //
    let root_dir = env::var(ENV_SALUDO_ROOT_DIR).unwrap_or_else(
        |_| {
            match args.root_dir.clone() {
                Some(r) => r,
                None => DEFAULT_ROOT_DIR.to_string(),
            }
        });

    get_absolute_path(&root_dir)
}

// ***************************************************************************
//                               Log Functions
// ***************************************************************************
// ---------------------------------------------------------------------------
// init_log:
// ---------------------------------------------------------------------------
/** Use the installed log4rs file if there is one, otherwise log at info level
 * to stderr so that stdout carries only the greetings.
 */
pub fn init_log(dirs: &SaludoDirs) -> Result<(), Errors> {
    let logconfig = dirs.config_dir.clone() + LOG4RS_CONFIG_FILE;
    if Path::new(&logconfig).is_file() {
        log4rs::init_file(&logconfig, Default::default())
            .map_err(|e| Errors::Log4rsInitialization(format!("{}: {}", logconfig, e)))?;
        info!("Log4rs initialized using: {}", logconfig);
    } else {
        log4rs::init_config(default_log_config()?)
            .map_err(|e| Errors::Log4rsInitialization(e.to_string()))?;
        info!("Log4rs initialized with the default stderr configuration.");
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// default_log_config:
// ---------------------------------------------------------------------------
fn default_log_config() -> Result<LogConfig, Errors> {
    let stderr = ConsoleAppender::builder()
        .target(Target::Stderr)
        .encoder(Box::new(PatternEncoder::new(DEFAULT_LOG_PATTERN)))
        .build();

    LogConfig::builder()
        .appender(Appender::builder().build("stderr", Box::new(stderr)))
        .build(Root::builder().appender("stderr").build(LevelFilter::Info))
        .map_err(|e| Errors::Log4rsInitialization(e.to_string()))
}

// ***************************************************************************
//                             Parms Functions
// ***************************************************************************
// ---------------------------------------------------------------------------
// get_parms:
// ---------------------------------------------------------------------------
/** Retrieve the application parameters from the configuration file in the
 * config directory.  A missing file means default values, a file that cannot
 * be parsed is an error.
 */
pub fn get_parms(config_file: &str) -> Result<Parms> {
    let config_file_abs = saludo_utils::get_absolute_path(config_file);
    info!("{}", Errors::ReadingConfigFile(config_file_abs.clone()));
    let contents = match fs::read_to_string(&config_file_abs) {
        Ok(c) => c,
        Err(_) => {
            info!("Unable to read configuration at {}. Using default values.", config_file_abs);
            return Ok(Parms { config_file: Default::default(), config: Config::new() });
        }
    };

    // Parse the toml configuration.
    let config : Config = match toml::from_str(&contents) {
        Ok(c)  => c,
        Err(e) => {
            let msg = format!("{}\n   {}", Errors::TOMLParseError(config_file_abs), e);
            error!("{}", msg);
            return Result::Err(anyhow!(msg));
        }
    };

    Ok(Parms { config_file: config_file_abs, config })
}

// ***************************************************************************
//                             Config Functions
// ***************************************************************************
// ---------------------------------------------------------------------------
// init_runtime_context:
// ---------------------------------------------------------------------------
pub fn init_runtime_context(saludo_dirs: SaludoDirs) -> Result<RuntimeCtx> {
    let parms = get_parms(&(saludo_dirs.config_dir.clone() + SALUDO_CONFIG_FILE))?;
    Ok(RuntimeCtx { parms, saludo_args: &SALUDO_ARGS, saludo_dirs })
}

impl RuntimeCtx {
    // -----------------------------------------------------------------------
    // handler_settings:
    // -----------------------------------------------------------------------
    /** Command line values win over the configuration file. */
    pub fn handler_settings(&self) -> HandlerSettings {
        merge_settings(&self.parms.config, self.saludo_args)
    }
}

fn merge_settings(config: &Config, args: &SaludoArgs) -> HandlerSettings {
    HandlerSettings {
        base_url: args.base_url.clone().unwrap_or_else(|| config.base_url.clone()),
        endpoint_path: config.endpoint_path.clone(),
        response_format: args.format.unwrap_or(config.response_format),
    }
}

// ***************************************************************************
//                                  Tests
// ***************************************************************************
#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn args(list: &[&str]) -> SaludoArgs {
        let mut v = vec!["saludo_client"];
        v.extend_from_slice(list);
        SaludoArgs::from_iter(v)
    }

    fn write_config(contents: &str) -> tempfile::NamedTempFile {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        f.write_all(contents.as_bytes()).unwrap();
        f
    }

    #[test]
    fn print_config() {
        let config = Config::new();
        assert_eq!(config.base_url, DEFAULT_BASE_URL);
        assert_eq!(config.endpoint_path, DEFAULT_ENDPOINT);
        assert_eq!(config.response_format, ResponseFormatKind::Json);
    }

    #[test]
    fn full_config_file() {
        let f = write_config(r#"
            title = "Saludos"
            base_url = "http://greeter.local:8080"
            endpoint_path = "/v2/saludo"
            response_format = "text"
        "#);
        let parms = get_parms(f.path().to_str().unwrap()).unwrap();
        assert_eq!(parms.config.title, "Saludos");
        assert_eq!(parms.config.base_url, "http://greeter.local:8080");
        assert_eq!(parms.config.endpoint_path, "/v2/saludo");
        assert_eq!(parms.config.response_format, ResponseFormatKind::Text);
    }

    #[test]
    fn partial_config_file_uses_defaults() {
        let f = write_config("response_format = \"text\"\n");
        let parms = get_parms(f.path().to_str().unwrap()).unwrap();
        assert_eq!(parms.config.base_url, DEFAULT_BASE_URL);
        assert_eq!(parms.config.response_format, ResponseFormatKind::Text);
    }

    #[test]
    fn missing_config_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("saludo.toml");
        let parms = get_parms(missing.to_str().unwrap()).unwrap();
        assert_eq!(parms.config_file, "");
        assert_eq!(parms.config.base_url, DEFAULT_BASE_URL);
    }

    #[test]
    fn bad_config_files_rejected() {
        let f = write_config("response_format = \"xml\"\n");
        assert!(get_parms(f.path().to_str().unwrap()).is_err());

        let f = write_config("base_url = \n");
        assert!(get_parms(f.path().to_str().unwrap()).is_err());
    }

    #[test]
    fn command_line_overrides() {
        let config = Config::new();
        let settings = merge_settings(&config, &args(&[]));
        assert_eq!(settings.base_url, DEFAULT_BASE_URL);
        assert_eq!(settings.response_format, ResponseFormatKind::Json);

        let settings = merge_settings(&config,
            &args(&["--base-url", "http://127.0.0.1:9000", "--format", "text"]));
        assert_eq!(settings.base_url, "http://127.0.0.1:9000");
        assert_eq!(settings.endpoint_path, DEFAULT_ENDPOINT);
        assert_eq!(settings.response_format, ResponseFormatKind::Text);
    }

    #[test]
    fn command_line_rejects_unknown_format() {
        let v = vec!["saludo_client", "--format", "xml"];
        assert!(SaludoArgs::from_iter_safe(v).is_err());
    }

    #[test]
    fn root_dir_argument() {
        // The environment variable takes precedence when it is set.
        if env::var(ENV_SALUDO_ROOT_DIR).is_err() {
            let root = get_root_dir(&args(&["--root-dir", "/tmp/saludo-root"]));
            assert_eq!(root, "/tmp/saludo-root");
        }
    }
}
