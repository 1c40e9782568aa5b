//! Path template compilation and matching.
//!
//! Templates are made of `/`-separated segments:
//!
//! - `/users` - literal segment
//! - `/:id` - param matching any single segment
//! - `/:id:?` - optional param
//! - `/:{number}:id` / `/:{string}:slug` - typed params (`\d+` / `\w+`)
//! - `/*` - wildcard; a trailing one catches the rest of the path, a mid-path
//!   one (`/files/*/raw`) matches exactly one segment
//!
//! Each template compiles into two regexes: a prefix `pattern` that also accepts
//! deeper sub-paths, and a `strict_pattern` anchored at the end.
//!
//! Param and wildcard values are always extracted as strings.

use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::sync::LazyLock;

use regex::{Regex, RegexBuilder};

use crate::error::{RouterError, RouterResult};

/// Named path params.
pub type Params = BTreeMap<String, String>;

/// Wildcard values keyed by capture index.
pub type Wildcards = BTreeMap<usize, String>;

/// Name used in [`PathMatcher::param_names`] for wildcard positions.
pub const WILDCARD: &str = "*";

/// Maximum allowed length for a template string in bytes.
const MAX_TEMPLATE_LENGTH: usize = 1024;

/// Maximum allowed number of segments in a template.
const MAX_TEMPLATE_SEGMENTS: usize = 32;

/// Maximum allowed size for a compiled regex (in bytes).
const MAX_REGEX_SIZE: usize = 1 << 20; // 1 MiB

static TITLE_TOKEN: LazyLock<Regex> =
	LazyLock::new(|| Regex::new(r":(?:\{\w+\}:)?(\w+)(:\?)?").unwrap());

static PARAM_SEGMENT: LazyLock<Regex> =
	LazyLock::new(|| Regex::new(r"^:(?:\{\w+\}:)?\w+(?::\?)?$").unwrap());

/// Value constraint of a param segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamKind {
	/// Any characters but `/`.
	Any,
	/// Digits only (`:{number}:`).
	Number,
	/// Word characters only (`:{string}:`).
	String,
}

impl ParamKind {
	fn regex(self) -> &'static str {
		match self {
			Self::Any => "[^/]+",
			Self::Number => r"\d+",
			Self::String => r"\w+",
		}
	}

	fn parse(raw: &str) -> Option<Self> {
		match raw {
			"number" => Some(Self::Number),
			"string" => Some(Self::String),
			_ => None,
		}
	}
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
	Static(String),
	Param {
		name: String,
		kind: ParamKind,
		optional: bool,
	},
	Wildcard,
}

/// Params and wildcards captured from a concrete path.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Extracted {
	/// Named params.
	pub params: Params,
	/// Wildcard values keyed by capture index.
	pub wildcards: Wildcards,
}

/// A compiled path template.
#[derive(Debug, Clone)]
pub struct PathMatcher {
	template: String,
	segments: Vec<Segment>,
	pattern: Regex,
	strict_pattern: Regex,
	param_names: Vec<String>,
}

impl PathMatcher {
	/// Compiles a template.
	///
	/// # Errors
	///
	/// Returns [`RouterError::InvalidPath`] if the template is empty, relative
	/// (`./`, `../`), too long, has too many segments or a malformed param.
	pub fn compile(template: &str) -> RouterResult<Self> {
		let normalized = normalize_template(template)?;
		let segments = parse_segments(&normalized)?;

		let mut body = String::new();
		let last = segments.len().saturating_sub(1);
		for (index, segment) in segments.iter().enumerate() {
			match segment {
				Segment::Static(literal) => {
					body.push('/');
					body.push_str(&regex::escape(literal));
				}
				Segment::Param {
					kind,
					optional: false,
					..
				} => {
					let _ = write!(body, "/({})", kind.regex());
				}
				Segment::Param {
					kind,
					optional: true,
					..
				} => {
					let _ = write!(body, "(?:/({}))?", kind.regex());
				}
				Segment::Wildcard if index == last => body.push_str("(?:/(.*))?"),
				Segment::Wildcard => body.push_str("/([^/]+?)"),
			}
		}

		let pattern = build_regex(&normalized, &format!("^{body}(?:/.*)?$"))?;
		let strict_pattern = build_regex(&normalized, &format!("^{body}/?$"))?;
		let param_names = names_of(&segments);

		Ok(Self {
			template: normalized,
			segments,
			pattern,
			strict_pattern,
			param_names,
		})
	}

	/// Returns the normalized template.
	pub fn template(&self) -> &str {
		&self.template
	}

	/// Returns param names in capture order, [`WILDCARD`] for wildcards.
	pub fn param_names(&self) -> &[String] {
		&self.param_names
	}

	/// Whether the template has no params and no wildcards.
	pub fn is_static(&self) -> bool {
		self.param_names.is_empty()
	}

	/// Returns the prefix pattern.
	pub fn pattern(&self) -> &Regex {
		&self.pattern
	}

	/// Returns the end-anchored pattern.
	pub fn strict_pattern(&self) -> &Regex {
		&self.strict_pattern
	}

	/// Tests a path, ignoring its query string and a leading `#`.
	pub fn is_match(&self, path: &str, strict: bool) -> bool {
		let path = clean_path(path);
		if strict {
			self.strict_pattern.is_match(path)
		} else {
			self.pattern.is_match(path)
		}
	}

	/// Captures params and wildcards from a path.
	///
	/// Returns empty maps when the path does not match.
	pub fn extract(&self, path: &str) -> Extracted {
		let mut extracted = Extracted::default();
		let Some(captures) = self.pattern.captures(clean_path(path)) else {
			return extracted;
		};

		for (index, name) in self.param_names.iter().enumerate() {
			let Some(value) = captures.get(index + 1) else {
				continue;
			};
			if name == WILDCARD {
				extracted.wildcards.insert(index, value.as_str().to_string());
			} else {
				extracted
					.params
					.insert(name.clone(), value.as_str().to_string());
			}
		}
		extracted
	}

	/// Builds a concrete path from this template.
	///
	/// # Errors
	///
	/// Returns [`RouterError::MissingRequiredParam`] when a required param has
	/// no value.
	pub fn substitute(&self, params: &Params, wildcards: &Wildcards) -> RouterResult<String> {
		render_segments(&self.template, &self.segments, params, wildcards)
	}
}

impl PartialEq for PathMatcher {
	fn eq(&self, other: &Self) -> bool {
		self.template == other.template
	}
}

impl Eq for PathMatcher {}

impl std::fmt::Display for PathMatcher {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		write!(f, "{}", self.template)
	}
}

/// Lists the param names of a template, [`WILDCARD`] for wildcards.
pub fn extract_param_names(template: &str) -> RouterResult<Vec<String>> {
	let normalized = normalize_template(template)?;
	Ok(names_of(&parse_segments(&normalized)?))
}

/// Substitutes params and wildcards into a path template.
///
/// Missing optional params drop their segment, wildcards without a value stay
/// as `*`.
pub fn substitute_path(template: &str, params: &Params, wildcards: &Wildcards) -> RouterResult<String> {
	let normalized = normalize_template(template)?;
	let segments = parse_segments(&normalized)?;
	render_segments(&normalized, &segments, params, wildcards)
}

/// Substitutes `:param` / `:param:?` tokens in a title template.
///
/// Missing optional params become empty, missing required ones are kept as is.
pub fn substitute_title(template: &str, params: &Params) -> String {
	TITLE_TOKEN
		.replace_all(template, |caps: &regex::Captures<'_>| {
			match params.get(&caps[1]) {
				Some(value) => value.clone(),
				None if caps.get(2).is_some() => String::new(),
				None => caps[0].to_string(),
			}
		})
		.trim()
		.to_string()
}

/// Whether `path` holds param or wildcard markers rather than only literal
/// segments.
pub fn is_template(path: &str) -> bool {
	path.split('/')
		.any(|segment| segment == WILDCARD || PARAM_SEGMENT.is_match(segment))
}

/// Byte offset of the `?` opening the query string.
///
/// The `?` of an optional param marker (`:id:?`) never starts a query.
pub(crate) fn query_start(path: &str) -> Option<usize> {
	path.match_indices('?')
		.map(|(index, _)| index)
		.find(|&index| !path[..index].ends_with(':'))
}

/// Strips a leading hash marker and the query string.
pub(crate) fn clean_path(path: &str) -> &str {
	let path = path.strip_prefix('#').unwrap_or(path);
	match query_start(path) {
		Some(index) => &path[..index],
		None => path,
	}
}

pub(crate) fn normalize_template(template: &str) -> RouterResult<String> {
	let trimmed = template.trim();
	if trimmed.is_empty() {
		return Err(RouterError::invalid_path(template, "template is empty"));
	}
	if trimmed.starts_with("./") || trimmed.starts_with("../") || trimmed == "." || trimmed == ".." {
		return Err(RouterError::invalid_path(template, "template is relative"));
	}
	if trimmed.len() > MAX_TEMPLATE_LENGTH {
		return Err(RouterError::invalid_path(
			template,
			format!(
				"length {} exceeds maximum allowed length of {} bytes",
				trimmed.len(),
				MAX_TEMPLATE_LENGTH
			),
		));
	}

	let mut normalized = if trimmed.starts_with('/') {
		trimmed.to_string()
	} else {
		format!("/{trimmed}")
	};
	while normalized.len() > 1 && normalized.ends_with('/') {
		normalized.pop();
	}
	Ok(normalized)
}

fn parse_segments(template: &str) -> RouterResult<Vec<Segment>> {
	let raw: Vec<&str> = template.split('/').filter(|s| !s.is_empty()).collect();
	if raw.len() > MAX_TEMPLATE_SEGMENTS {
		return Err(RouterError::invalid_path(
			template,
			format!(
				"{} segments exceed maximum of {}",
				raw.len(),
				MAX_TEMPLATE_SEGMENTS
			),
		));
	}
	raw.into_iter()
		.map(|segment| parse_segment(segment, template))
		.collect()
}

fn parse_segment(segment: &str, template: &str) -> RouterResult<Segment> {
	if segment == WILDCARD {
		return Ok(Segment::Wildcard);
	}
	let Some(marker) = segment.strip_prefix(':') else {
		return Ok(Segment::Static(segment.to_string()));
	};

	let (kind, rest) = match marker.strip_prefix('{') {
		Some(typed) => {
			let (kind, rest) = typed
				.split_once("}:")
				.ok_or_else(|| RouterError::invalid_path(template, format!("malformed typed param '{segment}'")))?;
			let kind = ParamKind::parse(kind)
				.ok_or_else(|| RouterError::invalid_path(template, format!("unknown param type '{kind}'")))?;
			(kind, rest)
		}
		None => (ParamKind::Any, marker),
	};

	let (name, optional) = match rest.strip_suffix(":?") {
		Some(name) => (name, true),
		None => (rest, false),
	};
	if name.is_empty() || !name.chars().all(|c| c.is_alphanumeric() || c == '_') {
		return Err(RouterError::invalid_path(
			template,
			format!("invalid param name in '{segment}'"),
		));
	}

	Ok(Segment::Param {
		name: name.to_string(),
		kind,
		optional,
	})
}

fn names_of(segments: &[Segment]) -> Vec<String> {
	segments
		.iter()
		.filter_map(|segment| match segment {
			Segment::Static(_) => None,
			Segment::Param { name, .. } => Some(name.clone()),
			Segment::Wildcard => Some(WILDCARD.to_string()),
		})
		.collect()
}

fn render_segments(
	template: &str,
	segments: &[Segment],
	params: &Params,
	wildcards: &Wildcards,
) -> RouterResult<String> {
	let mut path = String::new();
	let mut capture = 0;
	for segment in segments {
		match segment {
			Segment::Static(literal) => {
				path.push('/');
				path.push_str(literal);
			}
			Segment::Param { name, optional, .. } => {
				capture += 1;
				match params.get(name) {
					Some(value) if !value.is_empty() => {
						path.push('/');
						path.push_str(value);
					}
					_ if *optional => {}
					_ => {
						return Err(RouterError::MissingRequiredParam {
							param: name.clone(),
							template: template.to_string(),
						});
					}
				}
			}
			Segment::Wildcard => {
				path.push('/');
				path.push_str(wildcards.get(&capture).map(String::as_str).unwrap_or(WILDCARD));
				capture += 1;
			}
		}
	}

	if path.is_empty() {
		path.push('/');
	}
	Ok(path)
}

fn build_regex(template: &str, source: &str) -> RouterResult<Regex> {
	RegexBuilder::new(source)
		.size_limit(MAX_REGEX_SIZE)
		.build()
		.map_err(|e| RouterError::invalid_path(template, format!("failed to compile pattern: {e}")))
}
