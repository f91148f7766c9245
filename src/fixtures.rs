#[cfg(test)]
pub mod test {
    use serde::{Deserialize, Serialize};

    use crate::template::Template;
    use crate::types::FieldType;
    use crate::validator::{non_empty, one_of, range};

    /// A template without sections: `name`, `volume`, `muted`.
    pub fn flat_template() -> Template {
        Template::new().flat(|s| {
            s.field("name", FieldType::String, "player")
                .field("volume", FieldType::Integer, 50)
                .field("muted", FieldType::Boolean, false)
                .validator("name", &["name"], non_empty)
        })
    }

    /// A template with `[general]` and `[network]` sections.
    pub fn sectioned_template() -> Template {
        Template::new()
            .section("general", |s| {
                s.field("theme", FieldType::String, "light")
                    .field("autosave", FieldType::Boolean, true)
                    .validator("theme", &["theme"], one_of(&["light", "dark"]))
            })
            .section("network", |s| {
                s.field("host", FieldType::String, "localhost")
                    .field("port", FieldType::Integer, 8080)
                    .validator("port", &["port"], range(1, 65535))
            })
    }

    #[derive(Serialize, Deserialize, Debug, PartialEq)]
    pub struct GeneralSettings {
        pub theme: String,
        pub autosave: bool,
    }

    #[derive(Serialize, Deserialize, Debug, PartialEq)]
    pub struct NetworkSettings {
        pub host: String,
        pub port: u16,
    }

    /// Typed view of [`sectioned_template`].
    #[derive(Serialize, Deserialize, Debug, PartialEq)]
    pub struct AppSettings {
        pub general: GeneralSettings,
        pub network: NetworkSettings,
    }

    #[test]
    fn fixtures_extract() {
        use crate::template::ValidationInfo;
        assert!(ValidationInfo::extract("Flat", &flat_template()).is_ok());
        assert!(ValidationInfo::extract("App", &sectioned_template()).is_ok());
    }
}
