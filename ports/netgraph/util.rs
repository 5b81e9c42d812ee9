/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

/// Shorten an address for on-canvas display, keeping the port visible.
///
/// Counts characters rather than bytes, so multi-byte hostnames never split.
/// Addresses that fit are returned unchanged; longer ones keep their tail
/// (usually `:port`) after an ellipsis.
pub(crate) fn short_address(address: &str, max_chars: usize) -> String {
    let len = address.chars().count();
    if len <= max_chars {
        return address.to_string();
    }
    if max_chars == 0 {
        return String::new();
    }
    let tail: String = address
        .chars()
        .skip(len - (max_chars - 1))
        .collect();
    format!("\u{2026}{tail}")
}
