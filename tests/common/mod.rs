#![allow(dead_code)]

use std::{
    cell::RefCell,
    collections::{HashMap, VecDeque},
    rc::Rc,
    time::Duration,
};

use gh_member_snapshot::client::{GitHubClient, HttpResponse, Sleeper, Transport};

pub const API: &str = "https://api.test";

/// Replies to each URL with a queue of scripted responses. The last
/// response of a queue is repeated; unknown URLs get a 404.
#[derive(Clone, Default)]
pub struct Routes {
    routes: Rc<RefCell<HashMap<String, VecDeque<HttpResponse>>>>,
    pub hits: Rc<RefCell<Vec<String>>>,
}

impl Routes {
    pub fn on(&self, path: &str, response: HttpResponse) -> &Self {
        self.routes
            .borrow_mut()
            .entry(format!("{API}{path}"))
            .or_default()
            .push_back(response);
        self
    }

    pub fn hits_for(&self, path: &str) -> usize {
        let url = format!("{API}{path}");
        self.hits.borrow().iter().filter(|h| **h == url).count()
    }
}

impl Transport for Routes {
    fn get(&self, url: &str, _headers: &[(&str, String)]) -> Result<HttpResponse, String> {
        self.hits.borrow_mut().push(url.to_string());
        let mut routes = self.routes.borrow_mut();
        match routes.get_mut(url) {
            Some(queue) if queue.len() > 1 => Ok(queue.pop_front().unwrap_or_default()),
            Some(queue) => Ok(queue.front().cloned().unwrap_or_default()),
            None => Ok(status(404)),
        }
    }
}

#[derive(Clone, Default)]
pub struct RecordingSleeper(pub Rc<RefCell<Vec<Duration>>>);

impl Sleeper for RecordingSleeper {
    fn sleep(&self, duration: Duration) {
        self.0.borrow_mut().push(duration);
    }
}

pub fn json(body: &str) -> HttpResponse {
    HttpResponse {
        status: 200,
        headers: HashMap::from([("x-ratelimit-remaining".to_string(), "4999".to_string())]),
        body: body.to_string(),
    }
}

pub fn status(code: u16) -> HttpResponse {
    HttpResponse {
        status: code,
        headers: HashMap::new(),
        body: String::new(),
    }
}

pub fn client(routes: &Routes, token: Option<&str>) -> (GitHubClient, RecordingSleeper) {
    let sleeper = RecordingSleeper::default();
    let client = GitHubClient::with_parts(
        token.map(str::to_string),
        API,
        Box::new(routes.clone()),
        Box::new(sleeper.clone()),
    );
    (client, sleeper)
}

pub fn org_member(login: &str) -> String {
    format!(r#"{{"login":"{login}","html_url":"https://github.com/{login}"}}"#)
}
