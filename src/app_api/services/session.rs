use poem_openapi::payload::Json;

use crate::{
    app::AppContext,
    app_api::models::{LoginRequestDto, NoContentResponse, SessionResponse},
};

pub struct SessionService<'a> {
    pub app: &'a AppContext,
}

impl<'a> SessionService<'a> {
    pub fn new(app: &'a AppContext) -> Self {
        Self { app }
    }

    #[tracing::instrument(level = "debug", skip(self, req), fields(server_url = %req.server_url, username = %req.username))]
    pub async fn login(&self, req: LoginRequestDto) -> SessionResponse {
        if let Err(e) = self
            .app
            .login(&req.server_url, &req.username, &req.password)
            .await
        {
            tracing::error!(error = %e, "login failed");
            return e.into();
        }
        self.current().await
    }

    #[tracing::instrument(level = "debug", skip(self))]
    pub async fn current(&self) -> SessionResponse {
        match self.app.session().await {
            Ok(session) => SessionResponse::Ok(Json(session.into())),
            Err(e) => e.into(),
        }
    }

    #[tracing::instrument(level = "debug", skip(self))]
    pub async fn logout(&self) -> NoContentResponse {
        self.app.logout().await;
        NoContentResponse::NoContent
    }
}
