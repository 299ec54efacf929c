// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! ### [6.1.4 The String Type](https://tc39.es/ecma262/#sec-ecmascript-language-types-string-type)

use std::{
    borrow::Borrow,
    cmp::Ordering,
    fmt::{Debug, Display},
    ops::Deref,
    rc::Rc,
};

/// An immutable, cheaply clonable ECMAScript string.
///
/// Strings compare as sequences of UTF-16 code units: this is the order
/// required of module namespace keys and the one `Array.prototype.sort`
/// would produce. For code points outside the Basic Multilingual Plane it
/// differs from the byte order of the UTF-8 data.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct JsString(Rc<str>);

impl JsString {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Length of the string in UTF-16 code units.
    pub fn utf16_len(&self) -> usize {
        self.0.encode_utf16().count()
    }
}

impl PartialOrd for JsString {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for JsString {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.encode_utf16().cmp(other.0.encode_utf16())
    }
}

impl Borrow<str> for JsString {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl Deref for JsString {
    type Target = str;

    fn deref(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for JsString {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<&str> for JsString {
    fn from(value: &str) -> Self {
        Self(Rc::from(value))
    }
}

impl From<String> for JsString {
    fn from(value: String) -> Self {
        Self(Rc::from(value))
    }
}

impl PartialEq<str> for JsString {
    fn eq(&self, other: &str) -> bool {
        &*self.0 == other
    }
}

impl PartialEq<&str> for JsString {
    fn eq(&self, other: &&str) -> bool {
        &*self.0 == *other
    }
}

impl Debug for JsString {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        Debug::fmt(&*self.0, f)
    }
}

impl Display for JsString {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::JsString;

    #[test]
    fn orders_by_utf16_code_units() {
        // U+FF61 sorts after U+1F600 in UTF-16 (0xFF61 > 0xD83D) but before
        // it in UTF-8.
        let halfwidth = JsString::from("\u{FF61}");
        let emoji = JsString::from("\u{1F600}");
        assert!(emoji < halfwidth);
        assert!(halfwidth.as_str().as_bytes() < emoji.as_str().as_bytes());
    }

    #[test]
    fn ascii_order() {
        let mut names: Vec<JsString> = ["b", "a", "B", "default", "$"]
            .into_iter()
            .map(JsString::from)
            .collect();
        names.sort();
        let names: Vec<&str> = names.iter().map(JsString::as_str).collect();
        assert_eq!(names, ["$", "B", "a", "b", "default"]);
    }

    #[test]
    fn derefs_to_str() {
        fn binding_name(name: &str) -> &str {
            name
        }
        let name = JsString::from("*default*");
        assert_eq!(binding_name(&name), "*default*");
        assert!(name.starts_with('*'));
        // Ordering stays UTF-16 based through the handle.
        assert!(JsString::from("\u{1F600}") < JsString::from("\u{FF61}"));
    }

    #[test]
    fn utf16_length() {
        assert_eq!(JsString::from("abc").utf16_len(), 3);
        assert_eq!(JsString::from("\u{1F600}").utf16_len(), 2);
    }
}
