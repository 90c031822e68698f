use actix_web::HttpResponse;
use askama::Template;

/// Renders a page, or a bare 500 when the template itself fails.
pub fn render<T: Template>(template: T) -> HttpResponse {
    match template.render() {
        Ok(body) => HttpResponse::Ok().content_type(T::MIME_TYPE).body(body),
        Err(err) => {
            log::error!("Template render error: {err}");
            HttpResponse::InternalServerError().finish()
        }
    }
}
