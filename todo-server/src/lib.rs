pub mod config {
    use serde::Deserialize;

    #[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
    pub struct Config {
        #[serde(default = "default_host")]
        pub host: String,
        #[serde(default = "default_port")]
        pub port: u16,
    }

    impl Config {
        /// Loads configuration from environment variables (`HOST`, `PORT`).
        pub fn from_env() -> anyhow::Result<Self> {
            Self::from_source(config::Environment::default().try_parsing(true))
        }

        fn from_source(source: config::Environment) -> anyhow::Result<Self> {
            let settings = config::Config::builder().add_source(source).build()?;

            let config: Config = settings.try_deserialize()?;
            Ok(config)
        }

        /// Address the server binds to.
        pub fn server_address(&self) -> String {
            format!("{}:{}", self.host, self.port)
        }
    }

    impl Default for Config {
        fn default() -> Self {
            Self {
                host: default_host(),
                port: default_port(),
            }
        }
    }

    fn default_host() -> String {
        "0.0.0.0".to_string()
    }

    fn default_port() -> u16 {
        3000
    }

}
pub mod todo;
pub mod web;
