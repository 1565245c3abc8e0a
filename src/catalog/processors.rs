use std::sync::LazyLock;

use regex::Regex;

use super::numeric::{format_number, is_trim_space, parse_float_prefix, parse_int_prefix_f64};
use crate::types::RuleParams;

// Horizontal whitespace runs; line breaks survive normalisation.
static INNER_SPACE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^\S\r\n]+").expect("inner-space pattern is valid"));

pub(crate) fn parse_int(value: &str, _: &RuleParams<'_>) -> String {
    parse_int_prefix_f64(value).map_or_else(String::new, format_number)
}

pub(crate) fn parse_float(value: &str, _: &RuleParams<'_>) -> String {
    parse_float_prefix(value).map_or_else(String::new, format_number)
}

pub(crate) fn trim(value: &str, _: &RuleParams<'_>) -> String {
    value.trim_matches(is_trim_space).to_owned()
}

pub(crate) fn normalize(value: &str, params: &RuleParams<'_>) -> String {
    INNER_SPACE.replace_all(&trim(value, params), " ").into_owned()
}

pub(crate) fn no_space(value: &str, _: &RuleParams<'_>) -> String {
    value.chars().filter(|&c| !is_trim_space(c)).collect()
}

pub(crate) fn uppercase(value: &str, _: &RuleParams<'_>) -> String {
    value.to_uppercase()
}

pub(crate) fn lowercase(value: &str, _: &RuleParams<'_>) -> String {
    value.to_lowercase()
}
