use super::{Scope, run};
use crate::moderation::ActionRequest;
use crate::store::{TIMESTAMP_FORMAT, WarningRecord};
use crate::target::{ResolvedTarget, TargetArg};
use crate::{Context, Error};
use poise::CreateReply;
use poise::serenity_prelude::{Colour, CreateEmbed, CreateEmbedFooter};

/// Discord rejects embeds with more fields than this
const MAX_EMBED_FIELDS: usize = 25;

/// Issue a warning to a member
#[poise::command(slash_command, prefix_command, guild_only, category = "Warnings")]
pub async fn warn(
    ctx: Context<'_>,
    #[description = "Member"] target: TargetArg,
    #[description = "Why the member is warned"]
    #[rest]
    reason: String,
) -> Result<(), Error> {
    run(
        ctx,
        ActionRequest::Warn {
            target: target.into(),
            reason,
        },
    )
    .await
}

/// View warnings for a member
#[poise::command(slash_command, prefix_command, guild_only, category = "Warnings")]
pub async fn warnings(
    ctx: Context<'_>,
    #[description = "Member"] target: TargetArg,
) -> Result<(), Error> {
    let scope = Scope::new(ctx)?;
    let Some((target, records)) = scope
        .moderator()
        .view_warnings(&scope.inv, target.into())
        .await
    else {
        return Ok(());
    };
    ctx.send(CreateReply::default().embed(warnings_embed(&target, &records)))
        .await?;
    Ok(())
}

/// Remove all warnings for a member
#[poise::command(slash_command, prefix_command, guild_only, category = "Warnings")]
pub async fn clear_warnings(
    ctx: Context<'_>,
    #[description = "Member"] target: TargetArg,
) -> Result<(), Error> {
    run(
        ctx,
        ActionRequest::ClearWarnings {
            target: target.into(),
        },
    )
    .await
}

fn warning_field(index: usize, record: &WarningRecord) -> (String, String, bool) {
    (
        format!(
            "#{index}  -  {}",
            record.created_at.format(TIMESTAMP_FORMAT)
        ),
        format!(
            "Reason: {}\nMod: {}",
            record.reason, record.moderator_display
        ),
        false,
    )
}

fn warnings_embed(target: &ResolvedTarget, records: &[WarningRecord]) -> CreateEmbed {
    let fields = records
        .iter()
        .enumerate()
        .take(MAX_EMBED_FIELDS)
        .map(|(i, record)| warning_field(i + 1, record));
    let mut embed = CreateEmbed::new()
        .title(format!(
            "⚠️  Warnings for {}  ({})",
            target.display,
            records.len()
        ))
        .colour(Colour::ORANGE)
        .fields(fields);
    if records.len() > MAX_EMBED_FIELDS {
        embed = embed.footer(CreateEmbedFooter::new(format!(
            "Showing the first {MAX_EMBED_FIELDS} of {}",
            records.len()
        )));
    }
    embed
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use poise::serenity_prelude::UserId;

    #[test]
    fn test_warning_field_layout() {
        let record = WarningRecord {
            reason: "spam".into(),
            moderator_id: 9,
            moderator_display: "mod#0001".into(),
            created_at: Utc.with_ymd_and_hms(2024, 5, 1, 12, 30, 0).unwrap(),
        };
        let (name, value, inline) = warning_field(2, &record);
        assert_eq!(name, "#2  -  2024-05-01 12:30:00 UTC");
        assert_eq!(value, "Reason: spam\nMod: mod#0001");
        assert!(!inline);
    }

    fn record(n: u32) -> WarningRecord {
        WarningRecord {
            reason: format!("reason {n}"),
            moderator_id: 9,
            moderator_display: "mod".into(),
            created_at: Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, n).unwrap(),
        }
    }

    fn target() -> ResolvedTarget {
        ResolvedTarget {
            user_id: UserId::new(1),
            display: "someone".into(),
            is_bot: false,
        }
    }

    #[test]
    fn test_warnings_embed_lists_in_order() {
        let records: Vec<_> = (1..=3).map(record).collect();
        let json = serde_json::to_value(warnings_embed(&target(), &records)).unwrap();

        assert_eq!(json["title"], "⚠️  Warnings for someone  (3)");
        let fields = json["fields"].as_array().unwrap();
        assert_eq!(fields.len(), 3);
        for (i, field) in fields.iter().enumerate() {
            let name = field["name"].as_str().unwrap();
            assert!(name.starts_with(&format!("#{}  -  ", i + 1)), "{name}");
            assert_eq!(field["value"], format!("Reason: reason {}\nMod: mod", i + 1));
        }
        assert!(json.get("footer").is_none());
    }

    #[test]
    fn test_warnings_embed_caps_fields() {
        let records: Vec<_> = (1..=26).map(record).collect();
        let json = serde_json::to_value(warnings_embed(&target(), &records)).unwrap();

        let fields = json["fields"].as_array().unwrap();
        assert_eq!(fields.len(), MAX_EMBED_FIELDS);
        assert!(fields[24]["name"].as_str().unwrap().starts_with("#25  -  "));
        assert_eq!(json["footer"]["text"], "Showing the first 25 of 26");
    }

    #[test]
    fn test_command_definitions() {
        assert!(warn().guild_only);
        assert_eq!(warnings().name, "warnings");
        assert_eq!(clear_warnings().parameters.len(), 1);
    }
}
