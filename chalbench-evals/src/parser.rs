// Copyright 2025 Sushanth (https://github.com/sushanthpy)
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.

//! Parses the shorthand `"type:value"` assertion string format.

/// Splits on the first colon only. No colon yields a type with no value;
/// empty input yields an empty type with no value; a trailing colon yields
/// a type paired with an empty string value.
pub fn parse_assertion_string(input: &str) -> (String, Option<String>) {
    if input.is_empty() {
        return (String::new(), None);
    }
    match input.split_once(':') {
        Some((assertion_type, value)) => (assertion_type.to_string(), Some(value.to_string())),
        None => (input.to_string(), None),
    }
}
