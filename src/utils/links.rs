// src/utils/links.rs

use url::Url;

pub const BUILDER_ROUTE: &str = "/private/nova-prova";
pub const CATALOG_ROUTE: &str = "/private/todas-prova";
pub const TAKER_ROUTE: &str = "/private/responder-prova";
pub const RESULTS_ROUTE: &str = "/private/resultado-prova";
pub const LOGIN_ROUTE: &str = "/login";
pub const USER_ADMIN_ROUTE: &str = "/private/painel-usuario";

/// What a derived link points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkTarget {
    Exam(i64),
    Group(i64),
}

impl LinkTarget {
    fn query(&self) -> (&'static str, String) {
        match self {
            LinkTarget::Exam(id) => ("examId", id.to_string()),
            LinkTarget::Group(id) => ("groupId", id.to_string()),
        }
    }
}

/// `{origin}{route}?examId=..|groupId=..`
pub fn build(origin: &str, route: &str, target: LinkTarget) -> String {
    let (name, value) = target.query();
    match Url::parse(origin).and_then(|base| base.join(route)) {
        Ok(mut url) => {
            url.query_pairs_mut().append_pair(name, &value);
            url.to_string()
        }
        Err(e) => {
            tracing::warn!("Invalid public origin '{}': {}", origin, e);
            format!("{}{}?{}={}", origin.trim_end_matches('/'), route, name, value)
        }
    }
}

pub fn exam_share_url(origin: &str, exam_id: i64) -> String {
    build(origin, TAKER_ROUTE, LinkTarget::Exam(exam_id))
}

pub fn group_share_url(origin: &str, group_id: i64) -> String {
    build(origin, TAKER_ROUTE, LinkTarget::Group(group_id))
}

pub fn results_url(origin: &str, target: LinkTarget) -> String {
    build(origin, RESULTS_ROUTE, target)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn share_links_carry_the_right_parameter() {
        assert_eq!(
            exam_share_url("http://localhost:4200", 17),
            "http://localhost:4200/private/responder-prova?examId=17"
        );
        assert_eq!(
            group_share_url("https://provas.example.com/", 9),
            "https://provas.example.com/private/responder-prova?groupId=9"
        );
        assert_eq!(
            results_url("http://localhost:4200", LinkTarget::Group(3)),
            "http://localhost:4200/private/resultado-prova?groupId=3"
        );
    }
}
