use std::collections::HashMap;
use std::sync::{LazyLock, Mutex, PoisonError};

use regex::{Regex, RegexBuilder};

use super::numeric::{parse_float_prefix, to_number};
use super::RuleFault;
use crate::types::{Field, RuleParams};

static EMAIL: LazyLock<Regex> = LazyLock::new(|| {
    RegexBuilder::new(r"^[a-z0-9%_][a-z0-9%_.&+\-]*@([a-z0-9][a-z0-9\-]*\.)+[a-z]{2,10}$")
        .case_insensitive(true)
        .build()
        .expect("email pattern is valid")
});

const MAX_PATTERN_CACHE_SIZE: usize = 256;

/// Every text field is filled in. Non-text controls always satisfy it.
pub(crate) fn required(fields: &[&Field], _: &RuleParams<'_>) -> Result<bool, RuleFault> {
    Ok(fields.iter().all(|f| !f.is_blank()))
}

/// The first field reads as a number within `[min, max]`; either bound is optional.
pub(crate) fn range(fields: &[&Field], params: &RuleParams<'_>) -> Result<bool, RuleFault> {
    let Some(field) = fields.first() else {
        return Ok(true);
    };
    let Some(value) = parse_float_prefix(field.value()) else {
        return Ok(false);
    };
    let above_min = params.number("min").is_none_or(|min| value >= min);
    let below_max = params.number("max").is_none_or(|max| value <= max);
    Ok(above_min && below_max)
}

/// All values are equal, as numbers with `comparison="number"`, otherwise
/// as strings (case-folded when `nocase` is truthy).
pub(crate) fn eq(fields: &[&Field], params: &RuleParams<'_>) -> Result<bool, RuleFault> {
    let Some((first, rest)) = fields.split_first() else {
        return Ok(true);
    };
    if params.get("comparison") == Some("number") {
        let initial = to_number(first.value());
        return Ok(rest.iter().all(|f| to_number(f.value()) == initial));
    }
    if params.flag("nocase") {
        let initial = first.value().to_lowercase();
        return Ok(rest.iter().all(|f| f.value().to_lowercase() == initial));
    }
    Ok(rest.iter().all(|f| f.value() == first.value()))
}

/// At least one checkbox or radio in the set is checked. Sets without
/// checkable controls pass.
pub(crate) fn checked(fields: &[&Field], _: &RuleParams<'_>) -> Result<bool, RuleFault> {
    let mut checkable = fields.iter().filter(|f| f.control().is_checkable()).peekable();
    if checkable.peek().is_none() {
        return Ok(true);
    }
    Ok(checkable.any(|f| f.is_checked()))
}

/// A select has a selection; with `option`, that option is selected.
/// Non-select controls pass, and so does an `option` index the select
/// does not have.
pub(crate) fn selected(fields: &[&Field], params: &RuleParams<'_>) -> Result<bool, RuleFault> {
    let Some(field) = fields.first() else {
        return Ok(true);
    };
    if !field.control().is_select() {
        return Ok(true);
    }
    if field.selected_index().is_none() {
        return Ok(false);
    }
    let Some(option) = params.int("option") else {
        return Ok(true);
    };
    Ok(usize::try_from(option)
        .ok()
        .and_then(|i| field.option_selected(i))
        .unwrap_or(true))
}

pub(crate) fn email(fields: &[&Field], _: &RuleParams<'_>) -> Result<bool, RuleFault> {
    Ok(fields.first().is_none_or(|f| EMAIL.is_match(f.value())))
}

/// Compiled `regexp` patterns, keyed by pattern and flags.
///
/// Rule trees are long-lived and evaluated many times, so each distinct
/// pattern is compiled once. Invalid patterns are not cached.
#[derive(Debug, Default)]
pub(crate) struct PatternCache {
    compiled: Mutex<HashMap<(String, String), Regex>>,
}

impl PatternCache {
    fn get(&self, pattern: &str, flags: &str) -> Result<Regex, RuleFault> {
        let key = (pattern.to_owned(), flags.to_owned());
        let mut compiled = self.compiled.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(re) = compiled.get(&key) {
            return Ok(re.clone());
        }
        let re = RegexBuilder::new(pattern)
            .case_insensitive(flags.contains('i'))
            .multi_line(flags.contains('m'))
            .build()
            .map_err(|source| RuleFault::InvalidPattern {
                pattern: pattern.to_owned(),
                source,
            })?;
        if compiled.len() >= MAX_PATTERN_CACHE_SIZE {
            if let Some(evict) = compiled.keys().next().cloned() {
                compiled.remove(&evict);
            }
        }
        compiled.insert(key, re.clone());
        Ok(re)
    }

    /// `match` must cover the whole value; `partmatch` may match anywhere.
    /// With both present only `match` is checked, with neither the rule passes.
    pub(crate) fn regexp(
        &self,
        fields: &[&Field],
        params: &RuleParams<'_>,
    ) -> Result<bool, RuleFault> {
        let Some(field) = fields.first() else {
            return Ok(true);
        };
        let value = field.value();
        let flags: String = params
            .get("flags")
            .unwrap_or_default()
            .to_lowercase()
            .chars()
            .filter(|c| matches!(c, 'i' | 'm'))
            .collect();

        if let Some(pattern) = params.get("match") {
            let re = self.get(pattern, &flags)?;
            return Ok(re
                .find(value)
                .is_some_and(|m| m.start() == 0 && m.end() == value.len()));
        }
        if let Some(pattern) = params.get("partmatch") {
            return Ok(self.get(pattern, &flags)?.is_match(value));
        }
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Attributes;

    fn run(
        predicate: fn(&[&Field], &RuleParams<'_>) -> Result<bool, RuleFault>,
        fields: &[Field],
        attrs: &Attributes,
    ) -> bool {
        let refs: Vec<&Field> = fields.iter().collect();
        predicate(&refs, &RuleParams::new(attrs)).unwrap()
    }

    #[test]
    fn required_text_and_non_text() {
        let none = Attributes::new();
        assert!(run(required, &[Field::text("a", "x")], &none));
        assert!(!run(required, &[Field::text("a", "")], &none));
        assert!(run(required, &[Field::checkbox("c", false)], &none));
        assert!(!run(required, &[Field::text("a", "x"), Field::text("b", "")], &none));
    }

    #[test]
    fn range_bounds() {
        let attrs = Attributes::new().with("min", "18").with("max", "65");
        assert!(run(range, &[Field::text("age", "18")], &attrs));
        assert!(run(range, &[Field::text("age", "65")], &attrs));
        assert!(!run(range, &[Field::text("age", "70")], &attrs));
        assert!(!run(range, &[Field::text("age", "17.9")], &attrs));
        assert!(!run(range, &[Field::text("age", "old")], &attrs));
        assert!(run(range, &[Field::text("age", "30 years")], &attrs));
    }

    #[test]
    fn range_open_bounds() {
        let min_only = Attributes::new().with("min", "0");
        assert!(run(range, &[Field::text("n", "1e9")], &min_only));
        assert!(!run(range, &[Field::text("n", "-1")], &min_only));
        let junk_bound = Attributes::new().with("max", "lots");
        assert!(run(range, &[Field::text("n", "1e9")], &junk_bound));
    }

    #[test]
    fn eq_strings_and_case() {
        let plain = Attributes::new();
        let nocase = Attributes::new().with("nocase", "yes");
        let pair = [Field::text("pwd", "Secret"), Field::text("pwd2", "secret")];
        assert!(!run(eq, &pair, &plain));
        assert!(run(eq, &pair, &nocase));
        assert!(run(
            eq,
            &[Field::text("pwd", "secret"), Field::text("pwd2", "secret")],
            &plain
        ));
    }

    #[test]
    fn eq_numbers() {
        let numeric = Attributes::new().with("comparison", "number");
        assert!(run(eq, &[Field::text("a", "1.50"), Field::text("b", " 1.5 ")], &numeric));
        assert!(run(eq, &[Field::text("a", "0x10"), Field::text("b", "16")], &numeric));
        assert!(!run(eq, &[Field::text("a", "1"), Field::text("b", "2")], &numeric));
        assert!(!run(eq, &[Field::text("a", "x"), Field::text("b", "x")], &numeric));
        assert!(run(eq, &[Field::text("a", "x")], &numeric));
    }

    #[test]
    fn checked_groups() {
        let none = Attributes::new();
        assert!(!run(checked, &[Field::checkbox("c", false)], &none));
        assert!(run(checked, &[Field::checkbox("c", true)], &none));
        assert!(run(
            checked,
            &[Field::radio("r", "a", false), Field::radio("r", "b", true)],
            &none
        ));
        assert!(run(checked, &[Field::text("t", "x")], &none));
    }

    #[test]
    fn selected_options() {
        let none = Attributes::new();
        assert!(!run(selected, &[Field::select("s", 3, None)], &none));
        assert!(run(selected, &[Field::select("s", 3, Some(0))], &none));
        let second = Attributes::new().with("option", "1");
        assert!(run(selected, &[Field::select("s", 3, Some(1))], &second));
        assert!(!run(selected, &[Field::select("s", 3, Some(2))], &second));
        let missing = Attributes::new().with("option", "9");
        assert!(run(selected, &[Field::select("s", 3, Some(2))], &missing));
        let negative = Attributes::new().with("option", "-1");
        assert!(run(selected, &[Field::select("s", 3, Some(2))], &negative));
        assert!(run(selected, &[Field::text("t", "x")], &second));
        assert!(run(selected, &[Field::multi_select("m", 4, &[1, 3])], &none));
    }

    #[test]
    fn email_addresses() {
        let none = Attributes::new();
        for ok in ["user@example.com", "First.Last+tag@mail.Example.ORG", "a_b%c@x-y.co"] {
            assert!(run(email, &[Field::text("e", ok)], &none), "{ok}");
        }
        for bad in ["user", "@example.com", "user@example", "user@.com", "user@example.c"] {
            assert!(!run(email, &[Field::text("e", bad)], &none), "{bad}");
        }
    }

    #[test]
    fn regexp_full_and_partial() {
        let cache = PatternCache::default();
        let check = |attrs: Attributes, value: &str| {
            let field = Field::text("f", value);
            cache.regexp(&[&field], &RuleParams::new(&attrs)).unwrap()
        };
        assert!(check(Attributes::new().with("match", "[0-9]+"), "123"));
        assert!(!check(Attributes::new().with("match", "[0-9]+"), "123a"));
        assert!(!check(Attributes::new().with("match", "a|ab"), "ab"));
        assert!(check(Attributes::new().with("partmatch", "[0-9]"), "abc1"));
        assert!(!check(Attributes::new().with("match", "abc"), "ABC"));
        assert!(check(
            Attributes::new().with("match", "abc").with("flags", "Ig"),
            "ABC"
        ));
        assert!(check(
            Attributes::new().with("match", "x").with("partmatch", "y"),
            "x"
        ));
        assert!(check(Attributes::new(), "anything"));
    }

    #[test]
    fn regexp_invalid_pattern_is_fault() {
        let cache = PatternCache::default();
        let field = Field::text("f", "x");
        let attrs = Attributes::new().with("match", "(unclosed");
        let err = cache.regexp(&[&field], &RuleParams::new(&attrs)).unwrap_err();
        assert!(matches!(err, RuleFault::InvalidPattern { .. }));
    }
}
