/*
 * Created on Mon Jan 29 2024
 *
 * This file is a part of Gibbon
 * Gibbon is a free and open-source authorization engine written by
 * Sayan Nandan ("the Author") that stores users, groups and permissions
 * in a transactional document store and encodes set membership as
 * fixed-length bitmasks, trading a little write amplification for
 * single-read permission checks.
 *
 * Copyright (c) 2024, Sayan Nandan <ohsayan@outlook.com>
 *
 * This program is free software: you can redistribute it and/or modify
 * it under the terms of the GNU Affero General Public License as published by
 * the Free Software Foundation, either version 3 of the License, or
 * (at your option) any later version.
 *
 * This program is distributed in the hope that it will be useful,
 * but WITHOUT ANY WARRANTY; without even the implied warranty of
 * MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
 * GNU Affero General Public License for more details.
 *
 * You should have received a copy of the GNU Affero General Public License
 * along with this program. If not, see <https://www.gnu.org/licenses/>.
 *
*/

//! `gibbonctl`: the admin tool for Gibbon deployments. One subcommand for
//! now, `init`, which opens (or creates) a store and idempotently seeds
//! the permission and group universes.

mod args;

use {
    args::ParsedArgs,
    gibbon::{config, error::GibbonResult, Gibbon},
    std::{env, path::PathBuf, process},
};

const USAGE: &str = "\
gibbonctl v{version} | {url}

usage: gibbonctl init --uri=<file:path> [--config=<path>]

subcommands:
    init    create the store if needed and seed the permission and group
            universes; a store that is already seeded is left untouched

options:
    --uri       where the store lives, as `file:<path>` (or a bare path)
    --config    configuration file (default: ./gibbon.yaml if present)
";

fn main() {
    env_logger::Builder::new()
        .parse_filters(&env::var("GIBBON_LOG").unwrap_or_else(|_| "info".to_owned()))
        .init();
    let args: Vec<String> = env::args().skip(1).collect();
    if args.is_empty() || args[0] == "--help" || args[0] == "-h" {
        println!(
            "{}",
            USAGE
                .replace("{version}", gibbon::VERSION)
                .replace("{url}", gibbon::URL)
        );
        return;
    }
    if args[0] == "--version" || args[0] == "-v" {
        println!("gibbonctl v{}", gibbon::VERSION);
        return;
    }
    match run(args) {
        Ok(report) => println!("{report}"),
        Err(e) => {
            eprintln!("gibbonctl: {e}");
            process::exit(1);
        }
    }
}

fn run(args: Vec<String>) -> GibbonResult<String> {
    let mut parsed = ParsedArgs::parse(args)?;
    let subcommand = parsed.subcommand().to_owned();
    match subcommand.as_str() {
        "init" => init(&mut parsed),
        other => Err(args::usage_error(format!("unknown subcommand `{other}`")).into()),
    }
}

fn init(parsed: &mut ParsedArgs) -> GibbonResult<String> {
    let uri = parsed.take_required("--uri")?;
    let config_path = parsed.take_optional("--config")?.map(PathBuf::from);
    parsed.reject_leftovers()?;
    let store_path = parse_uri(&uri)?;
    let config = config::load(config_path.as_deref())?;
    let engine = Gibbon::open_at(config, &store_path)?;
    let seeded = engine.initialize(None)?;
    Ok(if seeded {
        format!("initialized store at `{}`", store_path.display())
    } else {
        log::info!("store was already seeded; nothing to do");
        format!("store at `{}` is already initialized", store_path.display())
    })
}

/// Accepts `file:<path>` or a bare filesystem path
fn parse_uri(uri: &str) -> GibbonResult<PathBuf> {
    let path = match uri.split_once(':') {
        Some(("file", rest)) => rest,
        Some((scheme, _)) => {
            return Err(
                args::usage_error(format!("unsupported store URI scheme `{scheme}`")).into(),
            )
        }
        None => uri,
    };
    if path.is_empty() {
        return Err(args::usage_error("the store URI names no path".to_owned()).into());
    }
    Ok(PathBuf::from(path))
}

#[cfg(test)]
mod tests {
    use super::parse_uri;

    #[test]
    fn uri_forms() {
        assert_eq!(
            parse_uri("file:./auth.db").unwrap(),
            std::path::PathBuf::from("./auth.db")
        );
        assert_eq!(
            parse_uri("/var/lib/gibbon.db").unwrap(),
            std::path::PathBuf::from("/var/lib/gibbon.db")
        );
        assert!(parse_uri("postgres://nope").is_err());
        assert!(parse_uri("file:").is_err());
    }
}
