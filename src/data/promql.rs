//! PromQL queries behind the detail page graphs.
//!
//! Queries are built as a small expression tree and printed the way the
//! Prometheus parser prints expressions, so they can be compared against
//! queries produced elsewhere. Range windows use the duration codec.

use std::collections::BTreeSet;
use std::fmt;

use slowatch_types::{Indicator, LabelMatcher, MatchOp, Metric, Milliseconds, Objective, METRIC_NAME_LABEL};

enum Expr<'a> {
    Number(f64),
    Selector {
        metric: &'a Metric,
        range: Milliseconds,
    },
    Call(&'static str, Box<Expr<'a>>),
    Sum {
        grouping: Vec<String>,
        expr: Box<Expr<'a>>,
    },
    Binary(Box<Expr<'a>>, &'static str, Box<Expr<'a>>),
    Paren(Box<Expr<'a>>),
}

impl fmt::Display for Expr<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Number(value) => write!(f, "{}", value),
            Expr::Selector { metric, range } => {
                write_selector(f, metric)?;
                write!(f, "[{}]", range)
            }
            Expr::Call(name, arg) => write!(f, "{}({})", name, arg),
            Expr::Sum { grouping, expr } => {
                if grouping.is_empty() {
                    write!(f, "sum({})", expr)
                } else {
                    write!(f, "sum by({}) ({})", grouping.join(", "), expr)
                }
            }
            Expr::Binary(lhs, op, rhs) => write!(f, "{} {} {}", lhs, op, rhs),
            Expr::Paren(expr) => write!(f, "({})", expr),
        }
    }
}

/// Metric name followed by its matchers, sorted. The `__name__` matcher
/// repeating the metric name is implied by the name and left out.
fn write_selector(f: &mut fmt::Formatter<'_>, metric: &Metric) -> fmt::Result {
    let mut matchers: Vec<String> = metric
        .matchers
        .iter()
        .filter(|m| !(m.name == METRIC_NAME_LABEL && m.op == MatchOp::Equal && m.value == metric.name))
        .map(format_matcher)
        .collect();
    matchers.sort();

    f.write_str(&metric.name)?;
    if !matchers.is_empty() {
        write!(f, "{{{}}}", matchers.join(","))?;
    }
    Ok(())
}

fn format_matcher(matcher: &LabelMatcher) -> String {
    let mut value = String::with_capacity(matcher.value.len());
    for c in matcher.value.chars() {
        match c {
            '\\' => value.push_str("\\\\"),
            '"' => value.push_str("\\\""),
            '\n' => value.push_str("\\n"),
            '\r' => value.push_str("\\r"),
            '\t' => value.push_str("\\t"),
            c => value.push(c),
        }
    }
    format!("{}{}\"{}\"", matcher.name, matcher.op, value)
}

fn number<'a>(value: f64) -> Box<Expr<'a>> {
    Box::new(Expr::Number(value))
}

fn call<'a>(name: &'static str, arg: Box<Expr<'a>>) -> Box<Expr<'a>> {
    Box::new(Expr::Call(name, arg))
}

fn over<'a>(func: &'static str, metric: &'a Metric, range: Milliseconds) -> Box<Expr<'a>> {
    call(func, Box::new(Expr::Selector { metric, range }))
}

fn sum<'a>(grouping: &[String], expr: Box<Expr<'a>>) -> Box<Expr<'a>> {
    Box::new(Expr::Sum {
        grouping: grouping.to_vec(),
        expr,
    })
}

fn binary<'a>(lhs: Box<Expr<'a>>, op: &'static str, rhs: Box<Expr<'a>>) -> Box<Expr<'a>> {
    Box::new(Expr::Binary(lhs, op, rhs))
}

fn paren(expr: Box<Expr<'_>>) -> Box<Expr<'_>> {
    Box::new(Expr::Paren(expr))
}

/// Labels matched on the errors metric but not on the total metric, e.g. the
/// status code label. Errors are split by these in range graphs.
fn error_labels(errors: &Metric, total: &Metric) -> Vec<String> {
    let mut labels: BTreeSet<&str> = errors.matchers.iter().map(|m| m.name.as_str()).collect();
    for matcher in &total.matchers {
        labels.remove(matcher.name.as_str());
    }
    labels.into_iter().map(String::from).collect()
}

/// Query builder for one objective.
///
/// Every method returns `None` when the objective has no indicator.
///
/// # Example
///
/// ```
/// use slowatch::Queries;
/// use slowatch_types::{Indicator, MatchOp, Metric, Milliseconds, Objective};
///
/// let objective = Objective::new("http_requests", 0.99, Milliseconds::from_weeks(4))
///     .with_indicator(Indicator::Ratio {
///         errors: Metric::new("http_requests_total").matcher("code", MatchOp::Regex, "5.."),
///         total: Metric::new("http_requests_total"),
///         grouping: vec![],
///     });
///
/// assert_eq!(
///     Queries::new(&objective).total(objective.window).unwrap(),
///     "sum(increase(http_requests_total[4w]))"
/// );
/// ```
#[derive(Debug, Clone, Copy)]
pub struct Queries<'a> {
    objective: &'a Objective,
}

impl<'a> Queries<'a> {
    pub fn new(objective: &'a Objective) -> Self {
        Self { objective }
    }

    fn indicator(&self) -> Option<&'a Indicator> {
        self.objective.indicator.as_ref()
    }

    /// Total number of requests during `window`.
    pub fn total(&self, window: Milliseconds) -> Option<String> {
        let indicator = self.indicator()?;
        let expr = sum(indicator.grouping(), over("increase", indicator.total(), window));
        Some(expr.to_string())
    }

    /// Number of failed requests during `window`.
    pub fn errors(&self, window: Milliseconds) -> Option<String> {
        let expr = match self.indicator()? {
            Indicator::Ratio {
                errors, grouping, ..
            } => sum(grouping, over("increase", errors, window)),
            Indicator::Latency {
                success,
                total,
                grouping,
            } => binary(
                sum(grouping, over("increase", total, window)),
                "-",
                sum(grouping, over("increase", success, window)),
            ),
        };
        Some(expr.to_string())
    }

    /// Fraction of the error budget left over the objective window.
    pub fn error_budget(&self) -> Option<String> {
        let window = self.objective.window;
        let target = self.objective.target;
        let allowed = || paren(binary(number(1.0), "-", number(target)));
        let no_errors = || call("vector", number(0.0));

        let error_ratio = match self.indicator()? {
            Indicator::Ratio {
                errors,
                total,
                grouping,
            } => binary(
                sum(grouping, binary(over("increase", errors, window), "or", no_errors())),
                "/",
                sum(grouping, over("increase", total, window)),
            ),
            Indicator::Latency { success, total, .. } => binary(
                number(1.0),
                "-",
                binary(
                    sum(&[], binary(over("increase", success, window), "or", no_errors())),
                    "/",
                    sum(&[], over("increase", total, window)),
                ),
            ),
        };

        let expr = binary(paren(binary(allowed(), "-", paren(error_ratio))), "/", allowed());
        Some(expr.to_string())
    }

    /// Request rate over `range`.
    pub fn request_range(&self, range: Milliseconds) -> Option<String> {
        let expr = match self.indicator()? {
            Indicator::Ratio { errors, total, .. } => binary(
                sum(&error_labels(errors, total), over("rate", total, range)),
                ">",
                number(0.0),
            ),
            Indicator::Latency { total, .. } => sum(&[], over("rate", total, range)),
        };
        Some(expr.to_string())
    }

    /// Error rate over `range`.
    pub fn errors_range(&self, range: Milliseconds) -> Option<String> {
        let expr = match self.indicator()? {
            Indicator::Ratio { errors, total, .. } => binary(
                sum(&error_labels(errors, total), over("rate", errors, range)),
                "/",
                call("scalar", sum(&[], over("rate", total, range))),
            ),
            Indicator::Latency { success, total, .. } => binary(
                sum(&[], over("rate", total, range)),
                "-",
                sum(&[], over("rate", success, range)),
            ),
        };
        Some(expr.to_string())
    }
}
