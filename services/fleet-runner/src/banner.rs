//! Startup banner

const ART: &str = r"
  _     _       _     _                       _
 | |   (_) __ _| |__ | |___      _____  _ __| | _____ _ __
 | |   | |/ _` | '_ \| __\ \ /\ / / _ \| '__| |/ / _ \ '__|
 | |___| | (_| | | | | |_ \ V  V / (_) | |  |   <  __/ |
 |_____|_|\__, |_| |_|\__| \_/\_/ \___/|_|  |_|\_\___|_|
          |___/                                     fleet
";

pub fn banner_text() -> String {
    format!("{ART}\n lightworker-fleet v{}\n", env!("CARGO_PKG_VERSION"))
}

/// Print the banner to stdout unless `NO_BANNER` is set.
pub fn print() {
    if std::env::var_os("NO_BANNER").is_some() {
        return;
    }
    println!("{}", banner_text());
}
