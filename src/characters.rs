use anyhow::{anyhow, Result};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};

pub const CHARACTER_API: &str = "https://rickandmortyapi.com/api";

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Character {
    pub id: i64,
    pub name: String,
    pub status: String,
    pub species: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub gender: String,
    pub origin: LocationRef,
    pub location: LocationRef,
    pub image: String,
    pub episode: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct LocationRef {
    pub name: String,
}

#[derive(Debug, Deserialize, Clone, Copy)]
pub struct PageInfo {
    pub count: i64,
    pub pages: i64,
}

#[derive(Deserialize)]
struct CharacterPage {
    info: PageInfo,
    results: Vec<Character>,
}

impl Character {
    /// One-line summary handed to the assistant widget as its context.
    pub fn summary(&self) -> String {
        format!(
            "Character: {} ({} {}) from {}, last seen at {}",
            self.name, self.status, self.species, self.origin.name, self.location.name
        )
    }
}

pub struct CharacterClient {
    client: Client,
    base_url: String,
}

impl CharacterClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub async fn list(&self, page: i64) -> Result<(Vec<Character>, PageInfo)> {
        let url = format!("{}/character?page={}", self.base_url, page);
        self.fetch_page(&url).await
    }

    /// Name search. The API answers a query matching nothing with 404,
    /// which is an empty result here, not an error.
    pub async fn search(&self, name: &str, page: i64) -> Result<(Vec<Character>, PageInfo)> {
        let url = format!(
            "{}/character?name={}&page={}",
            self.base_url,
            urlencode(name),
            page
        );

        let response = self.client.get(&url).send().await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok((Vec::new(), PageInfo { count: 0, pages: 0 }));
        }
        if !response.status().is_success() {
            return Err(anyhow!(
                "character search failed with status: {}",
                response.status()
            ));
        }

        let page: CharacterPage = response.json().await?;
        Ok((page.results, page.info))
    }

    pub async fn get(&self, id: i64) -> Result<Character> {
        let url = format!("{}/character/{}", self.base_url, id);

        let response = self.client.get(&url).send().await?;
        if !response.status().is_success() {
            return Err(anyhow!(
                "character {} request failed with status: {}",
                id,
                response.status()
            ));
        }

        Ok(response.json().await?)
    }

    async fn fetch_page(&self, url: &str) -> Result<(Vec<Character>, PageInfo)> {
        let response = self.client.get(url).send().await?;
        if !response.status().is_success() {
            return Err(anyhow!(
                "character list request failed with status: {}",
                response.status()
            ));
        }

        let page: CharacterPage = response.json().await?;
        Ok((page.results, page.info))
    }
}

/// Percent-encode the handful of bytes that matter in a query value.
fn urlencode(raw: &str) -> String {
    let mut encoded = String::with_capacity(raw.len());
    for byte in raw.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                encoded.push(byte as char)
            }
            b' ' => encoded.push_str("%20"),
            _ => encoded.push_str(&format!("%{:02X}", byte)),
        }
    }
    encoded
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_PAGE: &str = r#"{
        "info": { "count": 826, "pages": 42, "next": "...", "prev": null },
        "results": [
            {
                "id": 1,
                "name": "Rick Sanchez",
                "status": "Alive",
                "species": "Human",
                "type": "",
                "gender": "Male",
                "origin": { "name": "Earth (C-137)", "url": "" },
                "location": { "name": "Citadel of Ricks", "url": "" },
                "image": "https://example.com/1.jpeg",
                "episode": ["https://example.com/episode/1"],
                "url": "https://example.com/character/1",
                "created": "2017-11-04T18:48:46.250Z"
            }
        ]
    }"#;

    #[test]
    fn test_page_deserializes_with_extra_fields() {
        let page: CharacterPage = serde_json::from_str(SAMPLE_PAGE).unwrap();
        assert_eq!(page.info.pages, 42);
        assert_eq!(page.results.len(), 1);
        assert_eq!(page.results[0].name, "Rick Sanchez");
        assert_eq!(page.results[0].origin.name, "Earth (C-137)");
    }

    #[test]
    fn test_summary_line() {
        let page: CharacterPage = serde_json::from_str(SAMPLE_PAGE).unwrap();
        assert_eq!(
            page.results[0].summary(),
            "Character: Rick Sanchez (Alive Human) from Earth (C-137), last seen at Citadel of Ricks"
        );
    }

    #[test]
    fn test_urlencode_spaces_and_reserved() {
        assert_eq!(urlencode("rick sanchez"), "rick%20sanchez");
        assert_eq!(urlencode("a&b=c"), "a%26b%3Dc");
        assert_eq!(urlencode("plain-name_1.0~x"), "plain-name_1.0~x");
    }
}
