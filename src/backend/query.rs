//! PostgREST query-string filters.

/// One horizontal filter. Renders to a single `column=op.value` pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Filter {
    Eq(&'static str, String),
    Neq(&'static str, String),
    In(&'static str, Vec<String>),
    NotIn(&'static str, Vec<String>),
    /// Case-insensitive substring match on any of the columns.
    AnyContains(Vec<&'static str>, String),
}

impl Filter {
    pub fn eq(column: &'static str, value: impl ToString) -> Self {
        Filter::Eq(column, value.to_string())
    }

    pub fn neq(column: &'static str, value: impl ToString) -> Self {
        Filter::Neq(column, value.to_string())
    }

    pub fn is_in<T: ToString>(column: &'static str, values: &[T]) -> Self {
        Filter::In(column, values.iter().map(ToString::to_string).collect())
    }

    pub fn not_in<T: ToString>(column: &'static str, values: &[T]) -> Self {
        Filter::NotIn(column, values.iter().map(ToString::to_string).collect())
    }

    pub fn any_contains(columns: &[&'static str], term: &str) -> Self {
        Filter::AnyContains(columns.to_vec(), term.to_owned())
    }

    pub fn param(&self) -> (String, String) {
        match self {
            Filter::Eq(column, value) => (column.to_string(), format!("eq.{value}")),
            Filter::Neq(column, value) => (column.to_string(), format!("neq.{value}")),
            Filter::In(column, values) => (column.to_string(), format!("in.({})", list(values))),
            Filter::NotIn(column, values) => (column.to_string(), format!("not.in.({})", list(values))),
            Filter::AnyContains(columns, term) => {
                let pattern = quote(&format!("*{term}*"));
                let conditions: Vec<String> = columns
                    .iter()
                    .map(|column| format!("{column}.ilike.{pattern}"))
                    .collect();
                ("or".to_owned(), format!("({})", conditions.join(",")))
            }
        }
    }
}

fn list(values: &[String]) -> String {
    values.iter().map(|v| quote(v)).collect::<Vec<_>>().join(",")
}

/// Values inside `in.(...)` and `or=(...)` may carry `,.:()`, so they are
/// always double-quoted.
fn quote(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('"');
    for c in value.chars() {
        if c == '"' || c == '\\' {
            out.push('\\');
        }
        out.push(c);
    }
    out.push('"');
    out
}

/// A `GET` against one table.
#[derive(Debug, Clone)]
pub struct Select<'a> {
    pub table: &'a str,
    columns: &'a str,
    filters: Vec<Filter>,
    order: Option<&'a str>,
}

impl<'a> Select<'a> {
    pub fn from(table: &'a str) -> Self {
        Self { table, columns: "*", filters: Vec::new(), order: None }
    }

    pub fn columns(mut self, columns: &'a str) -> Self {
        self.columns = columns;
        self
    }

    pub fn filter(mut self, filter: Filter) -> Self {
        self.filters.push(filter);
        self
    }

    pub fn filter_opt(self, filter: Option<Filter>) -> Self {
        match filter {
            Some(filter) => self.filter(filter),
            None => self,
        }
    }

    /// e.g. `created_at.desc`
    pub fn order(mut self, order: &'a str) -> Self {
        self.order = Some(order);
        self
    }

    pub fn params(&self) -> Vec<(String, String)> {
        let mut params = vec![("select".to_owned(), self.columns.to_owned())];
        params.extend(self.filters.iter().map(Filter::param));
        if let Some(order) = self.order {
            params.push(("order".to_owned(), order.to_owned()));
        }
        params
    }
}

pub fn params(filters: &[Filter]) -> Vec<(String, String)> {
    filters.iter().map(Filter::param).collect()
}

/// The `Prefer` header directives the handlers use.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Prefer {
    Representation,
    Minimal,
    IgnoreDuplicates,
}

impl Prefer {
    pub fn as_str(&self) -> &'static str {
        match self {
            Prefer::Representation => "return=representation",
            Prefer::Minimal => "return=minimal",
            Prefer::IgnoreDuplicates => "resolution=ignore-duplicates",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pair(k: &str, v: &str) -> (String, String) {
        (k.to_owned(), v.to_owned())
    }

    #[test]
    fn select_renders_columns_filters_and_order() {
        let q = Select::from("social_sync_posts")
            .columns("author")
            .filter(Filter::eq("id", 42))
            .order("created_at.desc");
        assert_eq!(
            q.params(),
            vec![pair("select", "author"), pair("id", "eq.42"), pair("order", "created_at.desc")]
        );
    }

    #[test]
    fn list_values_are_quoted() {
        let f = Filter::is_in("id", &["a", "b,c"]);
        assert_eq!(f.param(), pair("id", r#"in.("a","b,c")"#));

        let f = Filter::not_in("id", &[1, 2]);
        assert_eq!(f.param(), pair("id", r#"not.in.("1","2")"#));
    }

    #[test]
    fn search_spans_both_columns() {
        let f = Filter::any_contains(&["fullname", "email"], "al\"ice");
        assert_eq!(
            f.param(),
            pair("or", r#"(fullname.ilike."*al\"ice*",email.ilike."*al\"ice*")"#)
        );
    }

    #[test]
    fn missing_optional_filter_is_skipped() {
        let q = Select::from("t").filter_opt(None).filter_opt(Some(Filter::neq("email", "x@y.z")));
        assert_eq!(q.params(), vec![pair("select", "*"), pair("email", "neq.x@y.z")]);
    }

    #[test]
    fn prefer_directives() {
        assert_eq!(Prefer::IgnoreDuplicates.as_str(), "resolution=ignore-duplicates");
        assert_eq!(Prefer::Minimal.as_str(), "return=minimal");
    }
}
