//! `shipdesk` command line: argument parsing, command execution and output.

pub mod app;
pub mod output;

use anyhow::{anyhow, bail, Result};

use crate::api::RegisterRequest;
use crate::identity::Role;

pub use app::App;

#[derive(Debug, Clone)]
pub enum Command {
    Login { phone: String, password: String, stay_signed_in: bool },
    Register(RegisterRequest),
    Logout,
    WhoAmI,
    Open { path: String },
    Listen,
    StaySignedIn(bool),
    Consent,
    Help,
}

pub fn usage(program: &str) -> String {
    format!(
        "Usage:\n  {program} login --phone <phone> --password <pw> [--stay-signed-in]\n  {program} register --name <full name> --phone <phone> --password <pw> --role <client|company> [--email <email>]\n  {program} logout\n  {program} whoami                        restore the session and print the signed-in user\n  {program} open <path>                   resolve a front-end route (guard + role gate)\n  {program} listen                        stream new-order notifications until Ctrl-C\n  {program} prefs stay-signed-in <on|off>\n  {program} prefs consent                 record cookie consent\n\nEnvironment:\n  SHIPDESK_API_BASE            API base URL (default http://localhost:5245/api)\n  SHIPDESK_HUB_PATH            hub path under the API base (default hub)\n  SHIPDESK_STATE_FILE          preference file (default ~/.shipdesk/state.json)\n  SHIPDESK_HTTP_TIMEOUT_SECS   request timeout in seconds\n  SHIPDESK_HUB_RECONNECT_MS    comma separated reconnect delays\n  RUST_LOG                     log filter (default info)"
    )
}

fn take_value(args: &[String], i: usize, flag: &str) -> Result<String> {
    args.get(i + 1).cloned().ok_or_else(|| anyhow!("{} requires a value", flag))
}

fn parse_switch(value: &str) -> Result<bool> {
    match value.to_ascii_lowercase().as_str() {
        "on" | "true" | "yes" => Ok(true),
        "off" | "false" | "no" => Ok(false),
        other => bail!("expected on or off, got '{}'", other),
    }
}

/// Parse arguments (program name already removed).
pub fn parse_args(args: &[String]) -> Result<Command> {
    let Some(cmd) = args.first() else { return Ok(Command::Help) };
    let rest = &args[1..];
    match cmd.as_str() {
        "-h" | "--help" | "help" => Ok(Command::Help),
        "login" => {
            let (mut phone, mut password, mut stay) = (None, None, false);
            let mut i = 0;
            while i < rest.len() {
                match rest[i].as_str() {
                    "--phone" => { phone = Some(take_value(rest, i, "--phone")?); i += 2; }
                    "--password" => { password = Some(take_value(rest, i, "--password")?); i += 2; }
                    "--stay-signed-in" => { stay = true; i += 1; }
                    other => bail!("unknown login argument '{}'", other),
                }
            }
            Ok(Command::Login {
                phone: phone.ok_or_else(|| anyhow!("login requires --phone"))?,
                password: password.ok_or_else(|| anyhow!("login requires --password"))?,
                stay_signed_in: stay,
            })
        }
        "register" => {
            let (mut name, mut phone, mut password, mut role, mut email) = (None, None, None, None, None);
            let mut i = 0;
            while i < rest.len() {
                let flag = rest[i].as_str();
                let value = take_value(rest, i, flag)?;
                match flag {
                    "--name" => name = Some(value),
                    "--phone" => phone = Some(value),
                    "--password" => password = Some(value),
                    "--email" => email = Some(value),
                    "--role" => role = Some(match Role::from_name(&value) {
                        Some(r @ (Role::Client | Role::Company)) => r,
                        _ => bail!("--role must be client or company"),
                    }),
                    other => bail!("unknown register argument '{}'", other),
                }
                i += 2;
            }
            Ok(Command::Register(RegisterRequest {
                full_name: name.ok_or_else(|| anyhow!("register requires --name"))?,
                phone_number: phone.ok_or_else(|| anyhow!("register requires --phone"))?,
                email,
                password: password.ok_or_else(|| anyhow!("register requires --password"))?,
                role: role.ok_or_else(|| anyhow!("register requires --role"))?,
            }))
        }
        "logout" => Ok(Command::Logout),
        "whoami" => Ok(Command::WhoAmI),
        "listen" => Ok(Command::Listen),
        "open" => match rest.first() {
            Some(path) => Ok(Command::Open { path: path.clone() }),
            None => bail!("open requires a path"),
        },
        "prefs" => match rest.first().map(String::as_str) {
            Some("stay-signed-in") => {
                let v = rest.get(1).ok_or_else(|| anyhow!("stay-signed-in requires on or off"))?;
                Ok(Command::StaySignedIn(parse_switch(v)?))
            }
            Some("consent") => Ok(Command::Consent),
            _ => bail!("prefs expects stay-signed-in <on|off> or consent"),
        },
        other => bail!("unknown command '{}'", other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(s: &str) -> Vec<String> { s.split_whitespace().map(str::to_string).collect() }

    #[test]
    fn parses_login() {
        match parse_args(&args("login --phone +201001234567 --password pw --stay-signed-in")).unwrap() {
            Command::Login { phone, password, stay_signed_in } => {
                assert_eq!(phone, "+201001234567");
                assert_eq!(password, "pw");
                assert!(stay_signed_in);
            }
            other => panic!("unexpected {:?}", other),
        }
        assert!(parse_args(&args("login --phone 1")).is_err());
        assert!(parse_args(&args("login --phone")).is_err());
    }

    #[test]
    fn register_rejects_admin() {
        assert!(parse_args(&args("register --name N --phone 1 --password p --role admin")).is_err());
        match parse_args(&args("register --name N --phone 1 --password p --role company")).unwrap() {
            Command::Register(r) => assert_eq!(r.role, Role::Company),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn parses_prefs_and_misc() {
        assert!(matches!(parse_args(&args("prefs stay-signed-in off")).unwrap(), Command::StaySignedIn(false)));
        assert!(matches!(parse_args(&args("prefs consent")).unwrap(), Command::Consent));
        assert!(matches!(parse_args(&args("open /user/orders/3")).unwrap(), Command::Open { .. }));
        assert!(matches!(parse_args(&[]).unwrap(), Command::Help));
        assert!(parse_args(&args("prefs stay-signed-in maybe")).is_err());
        assert!(parse_args(&args("frobnicate")).is_err());
    }
}
