use serde::Deserialize;

/// Free-word search terms, matched by the API against server attributes
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FreeWordFilter(pub Vec<String>);

impl FreeWordFilter {
    pub fn single(word: impl Into<String>) -> Self {
        Self(vec![word.into()])
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListServersParams {
    pub free_word: Option<FreeWordFilter>,
}

impl ListServersParams {
    pub fn free_word(word: impl Into<String>) -> Self {
        Self {
            free_word: Some(FreeWordFilter::single(word)),
        }
    }

    pub(crate) fn query_pairs(&self) -> Vec<(&'static str, &str)> {
        self.free_word
            .iter()
            .flat_map(|filter| filter.0.iter())
            .map(|word| ("free_word", word.as_str()))
            .collect()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ListServersResponse {
    #[serde(default)]
    pub servers: Vec<Server>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Server {
    pub server_id: String,
    pub service: ServerService,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ServerService {
    #[serde(default)]
    pub service_id: String,
    #[serde(default)]
    pub nickname: String,
}
