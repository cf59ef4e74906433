//! Version ordering and version ranges
//!
//! Ordering follows Maven's comparable version rules in a simplified, flat form:
//! - a version is split into items at '.', '-' and at transitions between digits and letters
//! - numeric items compare numerically and are greater than any qualifier
//! - qualifiers order alpha < beta < milestone < rc < snapshot < (release) < sp < anything else
//! - trailing zeros and release qualifiers ("", "ga", "final", "release") are insignificant

use std::cmp::Ordering;
use std::fmt;

#[derive(Debug, Clone)]
enum Item {
    /// decimal digits without leading zeros, "" for zero
    Number(String),
    Qualifier(String),
}

impl Item {
    fn number(digits: &str) -> Item {
        Item::Number(digits.trim_start_matches('0').to_string())
    }

    fn qualifier(s: &str, followed_by_digit: bool) -> Item {
        let canonical = match s {
            "a" if followed_by_digit => "alpha",
            "b" if followed_by_digit => "beta",
            "m" if followed_by_digit => "milestone",
            "cr" => "rc",
            "ga" | "final" | "release" => "",
            other => other,
        };
        Item::Qualifier(canonical.to_string())
    }

    fn is_null(&self) -> bool {
        match self {
            Item::Number(n) => n.is_empty(),
            Item::Qualifier(q) => q.is_empty(),
        }
    }

    /// rank of well-known qualifiers, unknown ones rank above all of them
    fn qualifier_rank(q: &str) -> usize {
        match q {
            "alpha" => 0,
            "beta" => 1,
            "milestone" => 2,
            "rc" => 3,
            "snapshot" => 4,
            "" => 5,
            "sp" => 6,
            _ => 7,
        }
    }

    fn compare_qualifiers(a: &str, b: &str) -> Ordering {
        Item::qualifier_rank(a).cmp(&Item::qualifier_rank(b))
            .then_with(|| if Item::qualifier_rank(a) == 7 { a.cmp(b) } else { Ordering::Equal })
    }

    /// `None` stands for a missing item, which compares like zero or a release qualifier
    fn compare(a: Option<&Item>, b: Option<&Item>) -> Ordering {
        match (a, b) {
            (None, None) => Ordering::Equal,
            (Some(a), None) => Item::compare_to_null(a),
            (None, Some(b)) => Item::compare_to_null(b).reverse(),
            (Some(Item::Number(a)), Some(Item::Number(b))) => a.len().cmp(&b.len()).then_with(|| a.cmp(b)),
            (Some(Item::Number(_)), Some(Item::Qualifier(_))) => Ordering::Greater,
            (Some(Item::Qualifier(_)), Some(Item::Number(_))) => Ordering::Less,
            (Some(Item::Qualifier(a)), Some(Item::Qualifier(b))) => Item::compare_qualifiers(a, b),
        }
    }

    fn compare_to_null(item: &Item) -> Ordering {
        match item {
            Item::Number(n) => if n.is_empty() { Ordering::Equal } else { Ordering::Greater },
            Item::Qualifier(q) => Item::compare_qualifiers(q, ""),
        }
    }
}

/// A version string with Maven ordering semantics. Equality is order-equality, i.e. "1.0" == "1".
#[derive(Debug, Clone)]
pub struct ComparableVersion {
    original: String,
    items: Vec<Item>,
}

impl ComparableVersion {
    pub fn parse(version: &str) -> ComparableVersion {
        let lower = version.trim().to_ascii_lowercase();
        let chars: Vec<char> = lower.chars().collect();

        let mut items = vec![];
        let mut start = 0;
        while start < chars.len() {
            if chars[start] == '.' || chars[start] == '-' {
                start += 1;
                continue;
            }

            let digits = chars[start].is_ascii_digit();
            let mut end = start;
            while end < chars.len()
                && chars[end] != '.'
                && chars[end] != '-'
                && chars[end].is_ascii_digit() == digits
            {
                end += 1;
            }

            let token: String = chars[start..end].iter().collect();
            if digits {
                items.push(Item::number(&token));
            }
            else {
                let followed_by_digit = chars.get(end).map(|c| c.is_ascii_digit()).unwrap_or(false);
                items.push(Item::qualifier(&token, followed_by_digit));
            }
            start = end;
        }

        while items.last().map(Item::is_null).unwrap_or(false) {
            items.pop();
        }

        ComparableVersion {
            original: version.to_string(),
            items,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.original
    }
}

impl Ord for ComparableVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        let len = self.items.len().max(other.items.len());
        (0..len)
            .map(|i| Item::compare(self.items.get(i), other.items.get(i)))
            .find(|o| *o != Ordering::Equal)
            .unwrap_or(Ordering::Equal)
    }
}

impl PartialOrd for ComparableVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for ComparableVersion {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for ComparableVersion {}

impl fmt::Display for ComparableVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.original)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Bound {
    version: ComparableVersion,
    inclusive: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Restriction {
    lower: Option<Bound>,
    upper: Option<Bound>,
}

impl Restriction {
    fn contains(&self, version: &ComparableVersion) -> bool {
        let above_lower = match &self.lower {
            None => true,
            Some(b) if b.inclusive => version >= &b.version,
            Some(b) => version > &b.version,
        };
        let below_upper = match &self.upper {
            None => true,
            Some(b) if b.inclusive => version <= &b.version,
            Some(b) => version < &b.version,
        };
        above_lower && below_upper
    }
}

/// A union of version intervals such as `[1.0,2.0)`, `[1.5]` or `(,1.0],[1.2,)`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionRange {
    restrictions: Vec<Restriction>,
}

impl VersionRange {
    /// Whether a version requirement uses range syntax rather than naming a version
    pub fn is_range(requirement: &str) -> bool {
        let trimmed = requirement.trim_start();
        trimmed.starts_with('[') || trimmed.starts_with('(')
    }

    pub fn parse(spec: &str) -> Result<VersionRange, String> {
        let mut restrictions = vec![];
        let mut rest = spec.trim();

        while !rest.is_empty() {
            let lower_inclusive = match rest.chars().next() {
                Some('[') => true,
                Some('(') => false,
                _ => return Err(format!("expected '[' or '(' at '{}'", rest)),
            };

            let close = rest.find([']', ')'])
                .ok_or_else(|| format!("unbounded range '{}'", spec))?;
            let upper_inclusive = rest[close..].starts_with(']');
            let content = &rest[1..close];

            restrictions.push(Self::parse_restriction(content, lower_inclusive, upper_inclusive)?);

            rest = rest[close + 1..].trim_start();
            if let Some(r) = rest.strip_prefix(',') {
                rest = r.trim_start();
                if rest.is_empty() {
                    return Err(format!("trailing ',' in '{}'", spec));
                }
            }
            else if !rest.is_empty() {
                return Err(format!("expected ',' between ranges in '{}'", spec));
            }
        }

        if restrictions.is_empty() {
            return Err("empty version range".to_string());
        }
        Ok(VersionRange { restrictions })
    }

    fn parse_restriction(content: &str, lower_inclusive: bool, upper_inclusive: bool) -> Result<Restriction, String> {
        match content.split_once(',') {
            None => {
                let version = content.trim();
                if version.is_empty() || !lower_inclusive || !upper_inclusive {
                    return Err(format!("single version must be written as [version], was '{}'", content));
                }
                let bound = Bound { version: ComparableVersion::parse(version), inclusive: true };
                Ok(Restriction { lower: Some(bound.clone()), upper: Some(bound) })
            }
            Some((lower, upper)) => {
                let lower = lower.trim();
                let upper = upper.trim();
                if upper.contains(',') {
                    return Err(format!("too many bounds in '{}'", content));
                }

                let lower = (!lower.is_empty()).then(|| Bound { version: ComparableVersion::parse(lower), inclusive: lower_inclusive });
                let upper = (!upper.is_empty()).then(|| Bound { version: ComparableVersion::parse(upper), inclusive: upper_inclusive });

                if let (Some(l), Some(u)) = (&lower, &upper) {
                    if u.version < l.version {
                        return Err(format!("upper bound is below lower bound in '{}'", content));
                    }
                }
                Ok(Restriction { lower, upper })
            }
        }
    }

    pub fn contains(&self, version: &ComparableVersion) -> bool {
        self.restrictions.iter().any(|r| r.contains(version))
    }

    /// The highest of the candidates inside this range
    pub fn select_highest<'a>(&self, candidates: impl IntoIterator<Item = &'a str>) -> Option<&'a str> {
        candidates.into_iter()
            .map(|c| (c, ComparableVersion::parse(c)))
            .filter(|(_, v)| self.contains(v))
            .max_by(|(_, a), (_, b)| a.cmp(b))
            .map(|(c, _)| c)
    }
}

/// The highest version in a list by Maven ordering
pub fn highest<'a>(versions: impl IntoIterator<Item = &'a str>) -> Option<&'a str> {
    versions.into_iter()
        .max_by_key(|v| ComparableVersion::parse(v))
}
