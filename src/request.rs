use std::fmt::{Debug, Display, Formatter};

use crate::client::Courier;
use crate::error::{CourierError, Result};
use crate::priority::Priority;

/// A message under construction. Obtained from [Courier::begin], finished with
///  [Request::send].
///
/// Every mutator returns a *new* `Request` and leaves the receiver untouched, so a
///  partially-built request can be retained and branched from without aliasing hazards:
///
/// ```no_run
/// # fn main() -> courier::Result<()> {
/// # let courier = courier::Courier::no_op();
/// let deploys = courier.begin().titled("Deployment")?;
/// deploys.with_body_args("v{} deployed", &[&"1.2.3"]).send()?;
/// deploys.with_body_args("v{} deployed", &[&"1.2.4"]).send()?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct Request {
    courier: Courier,
    title: String,
    body: String,
    priority: Priority,
}

impl Request {
    pub(crate) fn initial(courier: Courier) -> Request {
        Request {
            courier,
            title: String::new(),
            body: String::new(),
            priority: Priority::Low,
        }
    }

    /// Set the title of the message: at least 3 and at most 39 characters.
    pub fn titled(&self, title: impl Into<String>) -> Result<Request> {
        if !self.courier.is_active() {
            return Ok(self.clone());
        }

        let title = title.into();
        check_title(&title)?;

        Ok(Request { title, ..self.clone() })
    }

    /// Set the body of the message verbatim.
    pub fn with_body(&self, body: impl Into<String>) -> Request {
        if !self.courier.is_active() {
            return self.clone();
        }

        Request { body: body.into(), ..self.clone() }
    }

    /// Set the body of the message, substituting `{}` placeholders with `args` in order.
    ///  Placeholders beyond the supplied arguments are left as literal `{}` text, and
    ///  surplus arguments are ignored.
    pub fn with_body_args(&self, text: &str, args: &[&dyn Display]) -> Request {
        if !self.courier.is_active() {
            return self.clone();
        }

        Request { body: expand_template(text, args), ..self.clone() }
    }

    /// Append an error's description - its message and the chain of underlying causes -
    ///  to the body on a new line.
    pub fn with_error(&self, error: &(dyn std::error::Error + 'static)) -> Request {
        if !self.courier.is_active() {
            return self.clone();
        }

        Request { body: format!("{}\n{}", self.body, describe_error(error)), ..self.clone() }
    }

    /// Set the priority of the message.
    pub fn with_priority(&self, priority: Priority) -> Request {
        if !self.courier.is_active() {
            return self.clone();
        }

        Request { priority, ..self.clone() }
    }

    /// Hand the accumulated message to the owning client for asynchronous delivery. This
    ///  must be called, or else the message is never sent.
    ///
    /// Returns as soon as the message is submitted: a `send()` that returned `Ok` means
    ///  "a delivery attempt will be made", not "the message arrived". Delivery failures
    ///  are logged, never raised here. The only synchronous failure is validation of the
    ///  accumulated fields (a missing or out-of-bounds title).
    pub fn send(&self) -> Result<()> {
        self.courier.dispatch(self)
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn body(&self) -> &str {
        &self.body
    }

    pub fn priority(&self) -> Priority {
        self.priority
    }
}

impl Debug for Request {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "Request{{title:{:?}, body:{:?}, priority:{:?}}}", self.title, self.body, self.priority)
    }
}

pub(crate) fn check_title(title: &str) -> Result<()> {
    let length = title.chars().count();
    if length < 3 {
        return Err(CourierError::validation("title too short: minimum is 3 characters"));
    }
    if length >= 40 {
        return Err(CourierError::validation("title too long: maximum is 39 characters"));
    }
    Ok(())
}

fn expand_template(text: &str, args: &[&dyn Display]) -> String {
    let mut expanded = String::with_capacity(text.len());
    let mut rest = text;
    let mut args = args.iter();

    while let Some(placeholder) = rest.find("{}") {
        let Some(arg) = args.next() else {
            break; // remaining placeholders stay literal
        };
        expanded.push_str(&rest[..placeholder]);
        expanded.push_str(&arg.to_string());
        rest = &rest[placeholder + 2..];
    }

    expanded.push_str(rest);
    expanded
}

fn describe_error(error: &(dyn std::error::Error + 'static)) -> String {
    let mut description = error.to_string();

    let mut cause = error.source();
    while let Some(c) = cause {
        description.push_str("\ncaused by: ");
        description.push_str(&c.to_string());
        cause = c.source();
    }
    description
}

#[cfg(test)]
mod tests {
    use std::io;
    use std::sync::Arc;

    use rstest::rstest;

    use super::*;
    use crate::client::Courier;
    use crate::transport::MockConnectionProvider;

    /// a fully-functional client whose dispatches would go to a mock that expects none
    fn inert_courier() -> Courier {
        Courier::builder()
            .with_application_token("token-1234")
            .with_connection_provider(Arc::new(MockConnectionProvider::new()))
            .build()
            .unwrap()
    }

    #[tokio::test]
    async fn test_builder_round_trip() {
        let request = inert_courier().begin()
            .titled("Deployment").unwrap()
            .with_body_args("v{} deployed", &[&"1.2.3"])
            .with_priority(Priority::High);

        assert_eq!(request.title(), "Deployment");
        assert_eq!(request.body(), "v1.2.3 deployed");
        assert_eq!(request.priority(), Priority::High);
    }

    #[tokio::test]
    async fn test_mutators_leave_earlier_instances_untouched() {
        let initial = inert_courier().begin();
        let titled = initial.titled("Deployment").unwrap();
        let with_body = titled.with_body("all good");
        let with_priority = with_body.with_priority(Priority::Medium);

        assert_eq!(initial.title(), "");
        assert_eq!(initial.body(), "");
        assert_eq!(initial.priority(), Priority::Low);

        assert_eq!(titled.body(), "");
        assert_eq!(with_body.priority(), Priority::Low);

        assert_eq!(with_priority.title(), "Deployment");
        assert_eq!(with_priority.body(), "all good");
        assert_eq!(with_priority.priority(), Priority::Medium);
    }

    #[rstest]
    #[case(2, false)]
    #[case(3, true)]
    #[case(39, true)]
    #[case(40, false)]
    fn test_title_length_bounds(#[case] length: usize, #[case] accepted: bool) {
        let title = "x".repeat(length);
        assert_eq!(check_title(&title).is_ok(), accepted);
    }

    #[tokio::test]
    async fn test_titled_rejects_out_of_bounds_title() {
        let request = inert_courier().begin();

        assert!(matches!(request.titled("ab"), Err(CourierError::Validation { .. })));
        assert!(matches!(request.titled("x".repeat(40)), Err(CourierError::Validation { .. })));
    }

    #[tokio::test]
    async fn test_send_rejects_untitled_request() {
        let result = inert_courier().begin().with_body("no title set").send();

        assert!(matches!(result, Err(CourierError::Validation { .. })));
    }

    #[rstest]
    #[case("First {} Second {} Third {}", &["a", "b", "c"], "First a Second b Third c")]
    #[case("{} of {} nodes up", &["3", "5"], "3 of 5 nodes up")]
    #[case("missing args: {} and {}", &["only one"], "missing args: only one and {}")]
    #[case("no placeholders", &["ignored"], "no placeholders")]
    #[case("", &[], "")]
    fn test_template_expansion(#[case] text: &str, #[case] args: &[&str], #[case] expected: &str) {
        let args = args.iter().map(|a| a as &dyn Display).collect::<Vec<_>>();
        assert_eq!(expand_template(text, &args), expected);
    }

    #[derive(Debug, thiserror::Error)]
    #[error("schema migration failed")]
    struct MigrationError {
        #[source]
        cause: io::Error,
    }

    #[tokio::test]
    async fn test_with_error_appends_cause_chain_on_new_line() {
        let error = MigrationError {
            cause: io::Error::new(io::ErrorKind::ConnectionReset, "connection reset by peer"),
        };

        let request = inert_courier().begin()
            .with_body("update failed")
            .with_error(&error);

        assert_eq!(request.body(), "update failed\nschema migration failed\ncaused by: connection reset by peer");
    }

    #[test]
    fn test_no_op_client_accepts_anything_and_never_fails() {
        let request = Courier::no_op().begin()
            .titled("x").unwrap() // far too short, but the no-op variant must not care
            .with_body_args("{} {}", &[&1])
            .with_priority(Priority::High);

        request.send().unwrap();
        request.send().unwrap();
    }
}
