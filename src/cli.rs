//! CLI argument definitions using clap derive macros.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// Read, write and expire SharePoint federated-auth cookies.
///
/// Operates on a Netscape-format cookie file, loading it before each command
/// and writing it back after commands that change cookies.
#[derive(Parser, Debug)]
#[command(name = "spcookie")]
#[command(author, version, about)]
pub struct Cli {
    /// Increase output verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Cookie file to operate on (defaults to the config `cookie_file`, then
    /// `~/.config/spcookie/cookies.txt`)
    #[arg(long, value_name = "PATH", global = true)]
    pub cookie_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Print the cookies that would be sent to a URL
    Get(GetArgs),
    /// Store a raw Set-Cookie header for a URL
    Set(SetArgs),
    /// Expire FedAuth/rtFa for a SharePoint site (e.g. `contoso`)
    Remove(RemoveArgs),
    /// Expire every cookie visible to a host at Path=/
    RemoveByHost(RemoveByHostArgs),
    /// Remove every cookie from the cookie file
    Clear,
    /// Print a cookie Expires attribute value
    Expires(ExpiresArgs),
}

impl Command {
    /// Stable label for log output.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Get(_) => "get",
            Self::Set(_) => "set",
            Self::Remove(_) => "remove",
            Self::RemoveByHost(_) => "remove-by-host",
            Self::Clear => "clear",
            Self::Expires(_) => "expires",
        }
    }
}

#[derive(Args, Debug)]
pub struct GetArgs {
    /// URL to read cookies for
    pub url: String,

    /// Print a JSON object instead of name=value lines
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug)]
pub struct SetArgs {
    /// URL the Set-Cookie header is received from
    pub url: String,

    /// Raw Set-Cookie header value, e.g. "FedAuth=...; Path=/; Secure"
    pub set_cookie: String,
}

#[derive(Args, Debug)]
pub struct RemoveArgs {
    /// SharePoint site name (`contoso` for contoso.sharepoint.com)
    pub site: String,
}

#[derive(Args, Debug)]
pub struct RemoveByHostArgs {
    /// Host, host:port, or URL
    pub host: String,
}

#[derive(Args, Debug)]
#[group(required = true, multiple = false)]
pub struct ExpiresArgs {
    /// Days from now
    #[arg(long, allow_negative_numbers = true)]
    pub days: Option<i64>,

    /// Milliseconds from now
    #[arg(long, allow_negative_numbers = true)]
    pub millis: Option<i64>,

    /// Explicit instant as Unix seconds
    #[arg(long)]
    pub unix: Option<u64>,
}
