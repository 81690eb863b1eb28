//! `thinkact config`: starter config file and its location.

use thinkact_config::AppConfig;

pub fn run(path_only: bool) {
    if path_only {
        println!("{}", AppConfig::config_dir().join("config.toml").display());
    } else {
        print!("{}", AppConfig::default_toml());
    }
}
