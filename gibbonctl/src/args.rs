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

use {gibbon::config::ConfigError, std::collections::HashMap};

pub fn usage_error(msg: String) -> ConfigError {
    ConfigError::cli(msg)
}

/// `<subcommand> [--key=value | --key value]...`, collected without any
/// per-subcommand knowledge. Flags may repeat; consumers decide whether that
/// is an error.
#[derive(Debug, PartialEq)]
pub struct ParsedArgs {
    subcommand: String,
    options: HashMap<String, Vec<String>>,
}

impl ParsedArgs {
    pub fn parse(args: Vec<String>) -> Result<Self, ConfigError> {
        let mut it = args.into_iter();
        let subcommand = match it.next() {
            Some(s) if !s.starts_with('-') => s,
            Some(s) => return Err(usage_error(format!("expected a subcommand, found `{s}`"))),
            None => return Err(usage_error("expected a subcommand".to_owned())),
        };
        let mut options: HashMap<String, Vec<String>> = HashMap::new();
        while let Some(token) = it.next() {
            if !token.starts_with("--") {
                return Err(usage_error(format!("unexpected argument `{token}`")));
            }
            let (key, value) = match token.split_once('=') {
                Some((key, value)) => (key.to_owned(), value.to_owned()),
                None => match it.next() {
                    Some(value) if !value.starts_with("--") => (token, value),
                    _ => return Err(usage_error(format!("option `{token}` has no value"))),
                },
            };
            options.entry(key).or_default().push(value);
        }
        Ok(Self {
            subcommand,
            options,
        })
    }
    pub fn subcommand(&self) -> &str {
        &self.subcommand
    }
    pub fn take_required(&mut self, key: &str) -> Result<String, ConfigError> {
        self.take_optional(key)?
            .ok_or_else(|| usage_error(format!("missing required option `{key}`")))
    }
    pub fn take_optional(&mut self, key: &str) -> Result<Option<String>, ConfigError> {
        match self.options.remove(key) {
            Some(mut values) if values.len() == 1 => Ok(Some(values.remove(0))),
            Some(_) => Err(usage_error(format!("too many values for `{key}`"))),
            None => Ok(None),
        }
    }
    /// every option must have been consumed by now
    pub fn reject_leftovers(&self) -> Result<(), ConfigError> {
        match self.options.keys().next() {
            Some(key) => Err(usage_error(format!("unknown option `{key}`"))),
            None => Ok(()),
        }
    }
}
