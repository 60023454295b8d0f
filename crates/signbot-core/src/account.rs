//! Account list parsing: `name1@secret1&name2@secret2&...`.

use std::collections::HashMap;

use crate::error::{Result, SignbotError};
use crate::types::Account;

/// Default separator between account entries.
pub const DEFAULT_SEPARATOR: &str = "&";

/// Parse a delimited account list.
///
/// Each entry is `name@secret`, split at the first `@`. An entry without a
/// name gets a positional placeholder (`account-3`) and the whole entry as its
/// secret. Blank entries are ignored. Names are made unique by suffixing
/// repeats (`alice`, `alice#2`), so no account is silently dropped.
pub fn parse_accounts(input: &str, separator: &str) -> Result<Vec<Account>> {
    let separator = if separator.is_empty() {
        DEFAULT_SEPARATOR
    } else {
        separator
    };

    let mut accounts = Vec::new();
    let mut seen: HashMap<String, usize> = HashMap::new();

    for (idx, entry) in input
        .split(separator)
        .map(str::trim)
        .filter(|e| !e.is_empty())
        .enumerate()
    {
        let (name, secret) = match entry.split_once('@') {
            Some((name, secret)) if !name.trim().is_empty() => {
                (name.trim().to_string(), secret.trim())
            }
            Some((_, secret)) => (placeholder_name(idx), secret.trim()),
            None => (placeholder_name(idx), entry),
        };

        if secret.is_empty() {
            return Err(SignbotError::Account(format!(
                "Account '{name}' has an empty secret"
            )));
        }

        let count = seen.entry(name.clone()).or_insert(0);
        *count += 1;
        let name = if *count > 1 {
            format!("{name}#{count}")
        } else {
            name
        };

        accounts.push(Account::new(name, secret));
    }

    Ok(accounts)
}

fn placeholder_name(idx: usize) -> String {
    format!("account-{}", idx + 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_named_pairs() {
        let accounts = parse_accounts("alice@c1&bob@c2", "&").unwrap();
        assert_eq!(accounts.len(), 2);
        assert_eq!(accounts[0].name, "alice");
        assert_eq!(accounts[0].secret, "c1");
        assert_eq!(accounts[1].name, "bob");
        assert_eq!(accounts[1].secret, "c2");
    }

    #[test]
    fn test_entry_without_name_gets_placeholder() {
        let accounts = parse_accounts("alice@c1&rawcookie=xyz", "&").unwrap();
        assert_eq!(accounts[1].name, "account-2");
        assert_eq!(accounts[1].secret, "rawcookie=xyz");
    }

    #[test]
    fn test_secret_keeps_later_at_signs() {
        let accounts = parse_accounts("alice@token@with@ats", "&").unwrap();
        assert_eq!(accounts[0].name, "alice");
        assert_eq!(accounts[0].secret, "token@with@ats");
    }

    #[test]
    fn test_custom_separator_and_blank_entries() {
        let accounts = parse_accounts(" a@1 \n\n b@2 \n", "\n").unwrap();
        assert_eq!(accounts.len(), 2);
        assert_eq!(accounts[0].name, "a");
        assert_eq!(accounts[1].secret, "2");
    }

    #[test]
    fn test_duplicate_names_are_suffixed() {
        let accounts = parse_accounts("a@1&a@2&a@3", "&").unwrap();
        let names: Vec<_> = accounts.iter().map(|a| a.name.as_str()).collect();
        assert_eq!(names, vec!["a", "a#2", "a#3"]);
    }

    #[test]
    fn test_empty_secret_rejected() {
        assert!(parse_accounts("alice@", "&").is_err());
    }

    #[test]
    fn test_empty_input() {
        assert!(parse_accounts("", "&").unwrap().is_empty());
        assert!(parse_accounts("   ", "").unwrap().is_empty());
    }
}
