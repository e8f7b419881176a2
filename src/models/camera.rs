use sqlx::FromRow;

#[derive(Debug, Clone, PartialEq, FromRow)]
pub struct Camera {
    pub name: String,
    pub image_url: String,
}

impl Camera {
    pub fn markdown_link(&self) -> String {
        format!("[{}]({})", self.name, self.image_url)
    }
}
