use crate::data::DataInner;
use std::fmt::{Display, Formatter};
use std::path::PathBuf;
use std::time::Duration;

/// Snapshot of process-wide state shown by the `status` command
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusReport {
    pub prefix: String,
    pub total_warnings: usize,
    pub guilds_configured: usize,
    pub admin_ids_loaded: usize,
    pub data_dir: PathBuf,
    pub policy: &'static str,
    pub uptime: Duration,
}

impl StatusReport {
    #[must_use]
    pub fn collect(data: &DataInner) -> Self {
        Self {
            prefix: data.config.prefix.clone(),
            total_warnings: data.storage.warnings.total(),
            guilds_configured: data.storage.guild_configs.len(),
            admin_ids_loaded: data.config.admin_ids.len(),
            data_dir: data.storage.data_dir.clone(),
            policy: data.policy.name(),
            uptime: data.started_at.elapsed(),
        }
    }
}

impl Display for StatusReport {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "**📊  Bot Status**")?;
        writeln!(f, "Prefix: `{}`", self.prefix)?;
        writeln!(f, "Total warnings on record: {}", self.total_warnings)?;
        writeln!(f, "Guilds with config: {}", self.guilds_configured)?;
        writeln!(f, "Admin IDs loaded: {}", self.admin_ids_loaded)?;
        writeln!(f, "Data directory: `{}/`", self.data_dir.display())?;
        writeln!(f, "Authorization policy: `{}`", self.policy)?;
        write!(f, "Uptime: {}", format_uptime(self.uptime))
    }
}

/// `1d 2h 3m 4s`, leading zero units dropped
#[must_use]
pub fn format_uptime(uptime: Duration) -> String {
    let secs = uptime.as_secs();
    let (days, hours, minutes, seconds) = (
        secs / 86_400,
        (secs % 86_400) / 3_600,
        (secs % 3_600) / 60,
        secs % 60,
    );
    if days > 0 {
        format!("{days}d {hours}h {minutes}m {seconds}s")
    } else if hours > 0 {
        format!("{hours}h {minutes}m {seconds}s")
    } else if minutes > 0 {
        format!("{minutes}m {seconds}s")
    } else {
        format!("{seconds}s")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::PolicyKind;
    use crate::config::BotConfig;
    use crate::data::Data;
    use crate::store::keyed::tests::temp_dir;
    use crate::store::{ConfigField, WarningRecord};
    use poise::serenity_prelude::{GuildId, UserId};

    #[test]
    fn test_format_uptime() {
        assert_eq!(format_uptime(Duration::from_secs(5)), "5s");
        assert_eq!(format_uptime(Duration::from_secs(65)), "1m 5s");
        assert_eq!(format_uptime(Duration::from_secs(3_600)), "1h 0m 0s");
        assert_eq!(format_uptime(Duration::from_secs(90_061)), "1d 1h 1m 1s");
    }

    #[tokio::test]
    async fn test_collect_counts_store_contents() {
        let dir = temp_dir();
        let data = Data::load(BotConfig {
            token: "t".into(),
            prefix: "!".into(),
            admin_ids: vec![UserId::new(1), UserId::new(2)],
            test_guilds: Vec::new(),
            data_dir: dir.clone(),
            policy: PolicyKind::Permissions,
        })
        .await;

        let guild = GuildId::new(10);
        for reason in ["spam", "flood"] {
            data.storage.warnings.append(
                guild,
                UserId::new(3),
                WarningRecord::new(reason, UserId::new(1), "mod"),
            );
        }
        data.storage
            .guild_configs
            .set_field(guild, ConfigField::LogChannel, 99);

        let report = StatusReport::collect(&data);
        assert_eq!(report.total_warnings, 2);
        assert_eq!(report.guilds_configured, 1);
        assert_eq!(report.admin_ids_loaded, 2);
        assert_eq!(report.policy, "permissions");

        let text = report.to_string();
        assert!(text.contains("Prefix: `!`"));
        assert!(text.contains("Total warnings on record: 2"));
        assert!(text.contains(&format!("Data directory: `{}/`", dir.display())));
    }
}
