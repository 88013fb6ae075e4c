mod attachments;
mod ingest;
mod meeting;

pub(crate) fn fixture(name: &str) -> String {
    crate::common::load_fixture(&format!("rubin/{name}"))
}
