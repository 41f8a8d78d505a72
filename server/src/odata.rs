//! Translation of the restricted OData filter and orderby mini-languages
//! into store-neutral predicates and orderings.
//!
//! Only a fixed subset of operators against a fixed field allow-list is
//! supported. Expressions that fall outside the subset, including
//! unrecognized field names inside a recognized operator, translate to "no
//! constraint" rather than an error; existing harvester clients rely on
//! that permissiveness. Both parsers are total functions.

/// A filter expression parsed into its top-level form. Field names are kept
/// verbatim; the allow-list is only consulted during translation.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Filter {
    /// `<field> eq '<value>'`
    Equality { field: String, value: String },

    /// `contains(<field>, '<value>')`
    Contains { field: String, value: String },

    /// `startswith(<field>, '<value>')`
    StartsWith { field: String, value: String },

    /// Anything else.
    Unrecognized,
}

impl Filter {
    /// Parses a filter expression. The three forms are detected by substring
    /// presence, in priority order: `" eq "` anywhere wins over
    /// `"contains("`, which wins over `"startswith("`.
    pub fn parse(expression: &str) -> Filter {
        if let Some(index) = expression.find(" eq ") {
            let field = expression[..index].trim().to_owned();
            let value = strip_quote(expression[index + 4..].trim()).to_owned();

            return Filter::Equality { field, value };
        }

        if let Some(rest) = after_prefix(expression, "contains(") {
            return match parse_call(rest) {
                Some((field, value)) => Filter::Contains { field, value },
                None => Filter::Unrecognized,
            };
        }

        if let Some(rest) = after_prefix(expression, "startswith(") {
            return match parse_call(rest) {
                Some((field, value)) => Filter::StartsWith { field, value },
                None => Filter::Unrecognized,
            };
        }

        Filter::Unrecognized
    }

    /// Translates the parsed form into a predicate, consulting the field
    /// allow-list. Unrecognized fields degrade to `Predicate::All`.
    pub fn predicate(&self) -> Predicate {
        match self {
            Filter::Equality { field, value } => match field.as_str() {
                "item_status" => Predicate::StatusEquals(value.clone()),
                "item_category" => Predicate::CategoryEquals(value.clone()),
                "municipality_name" => Predicate::MunicipalityEquals(value.clone()),
                _ => Predicate::All,
            },
            Filter::Contains { field, value } => match field.as_str() {
                "item_name" => Predicate::NameContains(value.clone()),
                "item_description" => Predicate::DescriptionContains(value.clone()),
                _ => Predicate::All,
            },
            Filter::StartsWith { field, value } => match field.as_str() {
                "municipality_name" => Predicate::MunicipalityStartsWith(value.clone()),
                _ => Predicate::All,
            },
            Filter::Unrecognized => Predicate::All,
        }
    }
}

/// A single row constraint ready to be executed by the record store.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Predicate {
    /// No constraint; every record passes.
    All,
    StatusEquals(String),
    CategoryEquals(String),
    MunicipalityEquals(String),
    /// Case-insensitive substring match on the item name.
    NameContains(String),
    /// Case-insensitive substring match on the item description.
    DescriptionContains(String),
    /// Case-insensitive prefix match on the municipality name.
    MunicipalityStartsWith(String),
}

impl Default for Predicate {
    fn default() -> Self {
        Predicate::All
    }
}

/// An orderby expression: first whitespace-separated token is the field,
/// optional second token is the direction.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct OrderBy {
    pub field: String,
    pub direction: Direction,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Direction {
    Ascending,
    Descending,
}

impl OrderBy {
    /// Parses an orderby expression, or `None` for a blank one. Any second
    /// token other than `desc` (compared case-insensitively) means
    /// ascending.
    pub fn parse(expression: &str) -> Option<OrderBy> {
        let mut parts = expression.split_whitespace();
        let field = parts.next()?.to_owned();
        let direction = match parts.next() {
            Some(token) if token.to_lowercase() == "desc" => Direction::Descending,
            _ => Direction::Ascending,
        };

        Some(OrderBy { field, direction })
    }

    /// Translates the parsed expression into an ordering, consulting the
    /// field allow-list. Unrecognized fields leave the store order
    /// unconstrained.
    pub fn ordering(&self) -> Ordering {
        match self.field.as_str() {
            "created_at" => Ordering::CreatedAt(self.direction),
            "item_name" => Ordering::ItemName(self.direction),
            "item_date" => Ordering::ItemDate(self.direction),
            _ => Ordering::Unspecified,
        }
    }
}

/// An ordering ready to be executed by the record store.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Ordering {
    /// No ordering constraint; the store order applies.
    Unspecified,
    CreatedAt(Direction),
    ItemName(Direction),
    ItemDate(Direction),
}

/// Translates an optional filter expression into a predicate. Never fails.
pub fn translate_filter(expression: Option<&str>) -> Predicate {
    match expression {
        Some(expression) => Filter::parse(expression).predicate(),
        None => Predicate::All,
    }
}

/// Translates an optional orderby expression into an ordering. Never fails.
pub fn translate_orderby(expression: Option<&str>) -> Ordering {
    match expression {
        Some(expression) => OrderBy::parse(expression)
            .map(|orderby| orderby.ordering())
            .unwrap_or(Ordering::Unspecified),
        None => Ordering::Unspecified,
    }
}

fn after_prefix<'a>(expression: &'a str, name: &str) -> Option<&'a str> {
    expression
        .find(name)
        .map(|index| &expression[index + name.len()..])
}

/// Strips one leading and one trailing quote character, single or double.
/// Embedded quotes are not supported.
fn strip_quote(value: &str) -> &str {
    let value = value
        .strip_prefix('\'')
        .or_else(|| value.strip_prefix('"'))
        .unwrap_or(value);

    value
        .strip_suffix('\'')
        .or_else(|| value.strip_suffix('"'))
        .unwrap_or(value)
}

/// Extracts `field, 'value')` from the remainder of a function-style form.
/// The field is a bare `\w+` token and the value runs up to the next `')`;
/// embedded parentheses or quotes are not supported.
fn parse_call(rest: &str) -> Option<(String, String)> {
    let comma = rest.find(',')?;
    let field = &rest[..comma];

    if field.is_empty() || !field.chars().all(|c| c.is_alphanumeric() || c == '_') {
        return None;
    }

    let after = rest[comma + 1..].trim_start();
    let after = after.strip_prefix('\'')?;
    let end = after.find("')")?;
    let value = &after[..end];

    if value.is_empty() {
        return None;
    }

    Some((field.to_owned(), value.to_owned()))
}
