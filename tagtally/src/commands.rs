use crate::CLAP_STYLING;
use clap::{arg, command};

pub(crate) fn command_argument_builder() -> clap::Command {
    clap::Command::new("tagtally")
        .version(env!("CARGO_PKG_VERSION"))
        .bin_name("tagtally")
        .styles(CLAP_STYLING)
        .arg(arg!(-q --"quiet" "Suppress banner and non-essential output").required(false))
        .subcommand_required(false)
        .subcommand(
            command!("init")
                .about("Initializes the tagtally database on your filesystem")
                .arg(
                    arg!([PATH])
                        .required(false)
                        .help("Location to store the tagtally database")
                        .default_value("~/.config/tagtally/"),
                )
                .arg(
                    arg!(-f --"force")
                        .help(
                            "Forces the overwriting of any existing database at the specified \
                        location.",
                        )
                        .required(false),
                ),
        )
        .subcommand(
            command!("serve")
                .about(
                    "Starts the HTTP server that fetches pages, counts elements and keeps \
                per-domain statistics.",
                )
                .arg(
                    arg!(-l --"listen" <ADDR>)
                        .required(false)
                        .help("Address to bind the HTTP server to")
                        .default_value("127.0.0.1:8080"),
                )
                .arg(
                    arg!(-d --"database" <PATH>)
                        .required(false)
                        .help("Location of the tagtally database")
                        .default_value("~/.config/tagtally/"),
                )
                .arg(
                    arg!(--"timeout" <SECONDS>)
                        .required(false)
                        .help("Outbound fetch timeout in seconds")
                        .value_parser(clap::value_parser!(u64))
                        .default_value("10"),
                ),
        )
}
