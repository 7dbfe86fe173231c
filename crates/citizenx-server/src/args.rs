use std::fmt::{Debug, Display, Formatter};
use std::net::{IpAddr, SocketAddr};

use clap::{Parser, ValueEnum};

/// Default cap on uploaded image size: 10 MiB.
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

#[derive(Parser, Clone)]
#[command(version, about = "CitizenX incident reporting server")]
pub struct Args {
    /// IP address to listen on
    #[clap(
        short = 'i',
        long,
        env = "CITIZENX_INTERFACE",
        default_value = "0.0.0.0"
    )]
    pub interface: IpAddr,

    /// Port to listen on
    #[clap(short = 'p', long, env = "CITIZENX_PORT", default_value = "8080")]
    pub port: u16,

    /// PostgreSQL connection string; required with `--store postgres`
    #[clap(long, value_name = "URL", env = "DATABASE_URL")]
    pub database_url: Option<String>,

    /// Maximum number of pooled database connections
    #[clap(
        long,
        value_name = "N",
        env = "CITIZENX_MAX_DB_CONNECTIONS",
        default_value_t = 10
    )]
    pub max_db_connections: u32,

    /// Secret used to verify HS256 access tokens
    #[clap(long, value_name = "SECRET", env = "JWT_SECRET")]
    pub jwt_secret: String,

    /// Bucket that receives uploaded images; required with `--object-store s3`
    #[clap(long, value_name = "NAME", env = "AWS_BUCKET")]
    pub bucket: Option<String>,

    /// Public base URL of uploaded objects; defaults to the bucket's S3 endpoint
    #[clap(long, value_name = "URL", env = "CITIZENX_BUCKET_URL")]
    pub bucket_url: Option<String>,

    /// Largest accepted image upload, in bytes
    #[clap(
        long,
        value_name = "BYTES",
        env = "CITIZENX_MAX_UPLOAD_BYTES",
        default_value_t = DEFAULT_MAX_UPLOAD_BYTES
    )]
    pub max_upload_bytes: usize,

    /// Where users, reports and posts are kept
    #[clap(
        value_enum,
        long,
        value_name = "TYPE",
        env = "CITIZENX_STORE",
        default_value_t = StoreBackend::Postgres
    )]
    pub store: StoreBackend,

    /// Where uploaded images are kept
    #[clap(
        value_enum,
        long,
        value_name = "TYPE",
        env = "CITIZENX_OBJECT_STORE",
        default_value_t = ObjectBackend::S3
    )]
    pub object_store: ObjectBackend,

    /// Keep quiet and only log errors
    #[clap(short, long, conflicts_with = "verbose", default_value_t = false)]
    pub quiet: bool,

    #[clap(
        short = 'v',
        long,
        conflicts_with = "quiet",
        action = clap::ArgAction::Count,
        help = "Output details about requests and queries; specify multiple times for more detail"
    )]
    pub verbose: u8,
}

// Keeps the JWT secret and database password out of the startup log.
impl Debug for Args {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Args")
            .field("interface", &self.interface)
            .field("port", &self.port)
            .field("database_url", &self.database_url.as_ref().map(|_| "<redacted>"))
            .field("max_db_connections", &self.max_db_connections)
            .field("jwt_secret", &"<redacted>")
            .field("bucket", &self.bucket)
            .field("bucket_url", &self.bucket_url)
            .field("max_upload_bytes", &self.max_upload_bytes)
            .field("store", &self.store)
            .field("object_store", &self.object_store)
            .field("quiet", &self.quiet)
            .field("verbose", &self.verbose)
            .finish()
    }
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    /// Process-local tables; contents are lost on exit
    #[value(name = "memory")]
    Memory,
    #[value(name = "postgres")]
    Postgres,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectBackend {
    #[value(name = "memory")]
    Memory,
    #[value(name = "s3")]
    S3,
}

impl Display for StoreBackend {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let value = self.to_possible_value().unwrap();
        f.write_str(value.get_name())
    }
}

impl Display for ObjectBackend {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let value = self.to_possible_value().unwrap();
        f.write_str(value.get_name())
    }
}

impl Args {
    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.interface, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let args = Args::parse_from(["citizenx_server", "--jwt-secret", "s"]);

        assert_eq!(args.socket_addr(), "0.0.0.0:8080".parse().unwrap());
        assert_eq!(args.max_upload_bytes, DEFAULT_MAX_UPLOAD_BYTES);
        assert_eq!(args.store, StoreBackend::Postgres);
        assert_eq!(args.object_store, ObjectBackend::S3);
    }

    #[test]
    fn backends_by_name() {
        let args = Args::parse_from([
            "citizenx_server",
            "--jwt-secret",
            "s",
            "--store",
            "memory",
            "--object-store",
            "memory",
            "-vv",
        ]);

        assert_eq!(args.store.to_string(), "memory");
        assert_eq!(args.object_store.to_string(), "memory");
        assert_eq!(args.verbose, 2);
    }

    #[test]
    fn debug_output_hides_secrets() {
        let args = Args::parse_from([
            "citizenx_server",
            "--jwt-secret",
            "hunter2",
            "--database-url",
            "postgres://u:pw@db/citizenx",
        ]);

        let shown = format!("{args:?}");
        assert!(!shown.contains("hunter2"));
        assert!(!shown.contains("pw@db"));
    }
}
