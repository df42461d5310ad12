/*!
 * Benchmark Fixtures
 *
 * Payloads shared by the report binary, the criterion benches and the
 * integration tests. Each type carries both a reflected shape and a serde
 * implementation so every candidate encoder sees the same data.
 */

use crate::shape::Dynamic;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

// ============================================================================
// Simple
// ============================================================================

/// Nine flat fields
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimplePayload {
    pub st: i64,
    pub sid: i64,
    pub tt: String,
    pub gr: i64,
    pub uuid: String,
    pub ip: String,
    pub ua: String,
    pub tz: i64,
    pub v: bool,
}

crate::reflect_struct!(SimplePayload { st, sid, tt, gr, uuid, ip, ua, tz, v });

pub fn simple() -> SimplePayload {
    SimplePayload {
        st: 1,
        sid: 2,
        tt: "TestString".into(),
        gr: 4,
        uuid: "8f9a65eb-4807-4d57-b6e0-bda5d62f1429".into(),
        ip: "127.0.0.1".into(),
        ua: "Mozilla".into(),
        tz: 8,
        v: true,
    }
}

// ============================================================================
// Complex
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Leaf {
    pub x: String,
}

crate::reflect_struct!(Leaf { x });

/// Nested structs, nullable pointers, slices, fixed arrays and bytes
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComplexPayload {
    pub a: Leaf,
    #[serde(rename = "B1")]
    pub b1: Option<Box<Leaf>>,
    #[serde(rename = "B2")]
    pub b2: Option<Box<Leaf>>,
    pub c: Vec<String>,
    pub d: Vec<i64>,
    pub e: Vec<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub f: Option<Vec<f32>>,
    pub g: Option<Vec<Option<Box<u64>>>>,
    pub h: [String; 3],
    pub i: [i64; 1],
    pub j: [bool; 0],
    pub k: Bytes,
    pub l: Vec<Option<Box<i64>>>,
    pub m1: Vec<Leaf>,
    pub m2: Option<Vec<Leaf>>,
    pub n: Vec<Option<Box<Leaf>>>,
    pub o1: [Option<Box<i64>>; 3],
    #[serde(skip_serializing_if = "Option::is_none")]
    pub o2: Option<Box<[Option<Box<bool>>; 3]>>,
    pub p: [Option<Box<Leaf>>; 3],
    pub q: Vec<Vec<i64>>,
    pub r: [[String; 2]; 2],
}

crate::reflect_struct!(ComplexPayload {
    a,
    b1: "B1",
    b2: "B2",
    c,
    d,
    e,
    f [omit_empty],
    g,
    h,
    i [omit_empty],
    j,
    k,
    l,
    m1,
    m2,
    n,
    o1,
    o2 [omit_empty],
    p,
    q,
    r,
});

fn leaf(x: &str) -> Leaf {
    Leaf { x: x.into() }
}

pub fn complex() -> ComplexPayload {
    let (l1, l2) = (0i64, 42i64);
    let (m1, m2) = (leaf("Loreum"), Leaf::default());
    ComplexPayload {
        a: leaf("Loreum"),
        b1: None,
        b2: Some(Box::new(leaf("Ipsum"))),
        c: vec!["one".into(), "two".into(), "three".into()],
        d: vec![1, 2, 3],
        e: Vec::new(),
        f: None,
        g: None,
        h: ["alpha".into(), "beta".into(), "gamma".into()],
        i: [42],
        j: [],
        // deterministic stand-in for 32 random bytes
        k: Bytes::from_iter((0u8..32).map(|b| b.wrapping_mul(37).wrapping_add(11))),
        l: vec![Some(Box::new(l1)), Some(Box::new(l2)), None],
        m1: vec![m1.clone(), m2.clone()],
        m2: None,
        n: vec![Some(Box::new(m1.clone())), Some(Box::new(m2.clone())), None],
        o1: [Some(Box::new(l1)), Some(Box::new(l2)), None],
        o2: None,
        p: [Some(Box::new(m1)), Some(Box::new(m2)), None],
        q: vec![vec![1, 2], vec![3, 4]],
        r: [["a".into(), "b".into()], ["c".into(), "d".into()]],
    }
}

// ============================================================================
// Interface and Map
// ============================================================================

/// A string behind a dynamic value
pub fn interface() -> Box<dyn Dynamic> {
    Box::new(String::from("Loreum"))
}

pub fn map() -> HashMap<String, i64> {
    HashMap::from([("a".into(), 1), ("b".into(), 2), ("c".into(), 3)])
}

// ============================================================================
// Medium
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Avatar {
    pub url: String,
}

crate::reflect_struct!(Avatar { url });

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Gravatar {
    pub avatars: Vec<Box<Avatar>>,
}

crate::reflect_struct!(Gravatar { avatars });

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Github {
    pub followers: i64,
}

crate::reflect_struct!(Github { followers });

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Name {
    #[serde(rename = "fullName")]
    pub full_name: String,
}

crate::reflect_struct!(Name { full_name: "fullName" });

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Person {
    pub name: Option<Box<Name>>,
    pub github: Option<Box<Github>>,
    pub gravatar: Option<Box<Gravatar>>,
}

crate::reflect_struct!(Person { name, github, gravatar });

/// A subset of a contact-enrichment API response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediumPayload {
    pub person: Option<Box<Person>>,
    #[serde(rename = "compnay", default)]
    pub company: String,
}

crate::reflect_struct!(MediumPayload { person, company: "compnay" });

pub const MEDIUM_FIXTURE: &str = r#"{
  "person": {
    "id": "d50887ca-a6ce-4e59-b89f-14f0b5d03b03",
    "name": {
      "fullName": "Leonid Bugaev",
      "givenName": "Leonid",
      "familyName": "Bugaev"
    },
    "email": "leonsbox@gmail.com",
    "gender": "male",
    "location": "Saint Petersburg, Saint Petersburg, RU",
    "geo": {
      "city": "Saint Petersburg",
      "state": "Saint Petersburg",
      "country": "Russia",
      "lat": 59.9342802,
      "lng": 30.3350986
    },
    "bio": "Senior engineer at Granify.com",
    "site": "http://flickfaver.com",
    "avatar": "https://d1ts43dypk8bqh.cloudfront.net/v1/avatars/d50887ca-a6ce-4e59-b89f-14f0b5d03b03",
    "employment": {
      "name": "www.latera.ru",
      "title": "Software Engineer",
      "domain": "gmail.com"
    },
    "facebook": {
      "handle": "leonid.bugaev"
    },
    "github": {
      "handle": "buger",
      "id": 14009,
      "avatar": "https://avatars.githubusercontent.com/u/14009?v=3",
      "company": "Granify",
      "blog": "http://leonsbox.com",
      "followers": 95,
      "following": 10
    },
    "twitter": {
      "handle": "flickfaver",
      "id": 77004410,
      "bio": null,
      "followers": 2,
      "following": 1,
      "statuses": 5,
      "favorites": 0,
      "location": "",
      "site": "http://flickfaver.com",
      "avatar": null
    },
    "linkedin": {
      "handle": "in/leonidbugaev"
    },
    "googleplus": {
      "handle": null
    },
    "angellist": {
      "handle": "leonid-bugaev",
      "id": 61541,
      "bio": "Senior engineer at Granify.com",
      "blog": "http://buger.github.com",
      "site": "http://buger.github.com",
      "followers": 41,
      "avatar": "https://d1qb2nb5cznatu.cloudfront.net/users/61541-medium_jpg?1405474390"
    },
    "klout": {
      "handle": null,
      "score": null
    },
    "foursquare": {
      "handle": null
    },
    "aboutme": {
      "handle": "leonid.bugaev",
      "bio": null,
      "avatar": null
    },
    "gravatar": {
      "handle": "buger",
      "urls": [],
      "avatar": "http://1.gravatar.com/avatar/f7c8edd577d13b8930d5522f28123510",
      "avatars": [
        {
          "url": "http://1.gravatar.com/avatar/f7c8edd577d13b8930d5522f28123510",
          "type": "thumbnail"
        }
      ]
    },
    "fuzzy": false
  },
  "company": null
}"#;

/// Typed view of the medium document
pub fn medium() -> Result<MediumPayload, serde_json::Error> {
    serde_json::from_str(MEDIUM_FIXTURE)
}

/// The full medium document as an untyped tree
pub fn medium_value() -> Result<serde_json::Value, serde_json::Error> {
    serde_json::from_str(MEDIUM_FIXTURE)
}
