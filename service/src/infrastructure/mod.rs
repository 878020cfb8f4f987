use crate::domain::AppState;
use crate::domain::repository::ResearchRepository;
use crate::domain::research::ResearchService;
use crate::infrastructure::http::auth::JwtSessionVerifier;

pub mod http;
pub mod persistence;
pub mod settings;

#[derive(Clone)]
pub struct AppStateImpl<R: ResearchRepository> {
    research: ResearchService<R>,
    sessions: JwtSessionVerifier,
}

impl<R: ResearchRepository> AppStateImpl<R> {
    pub fn new(research: ResearchService<R>, sessions: JwtSessionVerifier) -> Self {
        Self { research, sessions }
    }
}

impl<R: ResearchRepository> AppState for AppStateImpl<R> {
    type R = R;
    type V = JwtSessionVerifier;

    fn research(&self) -> &ResearchService<Self::R> {
        &self.research
    }

    fn sessions(&self) -> &Self::V {
        &self.sessions
    }
}
