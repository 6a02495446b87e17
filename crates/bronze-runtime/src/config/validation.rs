//! Configuration validation utilities.

use std::collections::HashSet;

use bronze_framework::PriorityOrder;

use super::error::{ConfigError, ConfigResult};
use super::schema::{BronzeConfig, CommandsConfig, LogOutput, LoggingConfig};

/// Validates the entire configuration.
pub fn validate_config(config: &BronzeConfig) -> ConfigResult<()> {
    validate_logging_config(&config.logging)?;
    validate_commands_config(&config.commands)?;
    Ok(())
}

fn validate_logging_config(logging: &LoggingConfig) -> ConfigResult<()> {
    if logging.output == LogOutput::File && logging.file_path.is_none() {
        return Err(ConfigError::missing_field("logging.file_path"));
    }

    if let Some(module) = logging.filters.keys().find(|module| module.trim().is_empty()) {
        return Err(ConfigError::validation(format!(
            "Log filter module name cannot be blank: {module:?}"
        )));
    }

    Ok(())
}

fn validate_commands_config(commands: &CommandsConfig) -> ConfigResult<()> {
    if commands.prefix.is_empty() {
        return Err(ConfigError::missing_field("commands.prefix"));
    }
    validate_prefix("commands.prefix", &commands.prefix)?;
    validate_prefix("commands.help_prefix", &commands.help_prefix)?;

    if commands.help_prefix == commands.prefix {
        return Err(ConfigError::validation(
            "Help prefix must differ from the command prefix",
        ));
    }

    if commands.missing_parameter_reply.trim().is_empty() {
        return Err(ConfigError::missing_field("commands.missing_parameter_reply"));
    }

    validate_preprocessor_order(&commands.preprocessor_order)
}

fn validate_prefix(field: &str, prefix: &str) -> ConfigResult<()> {
    if prefix.chars().any(char::is_whitespace) {
        return Err(ConfigError::validation(format!(
            "{field} cannot contain whitespace: {prefix:?}"
        )));
    }
    Ok(())
}

fn validate_preprocessor_order(order: &[String]) -> ConfigResult<()> {
    let mut seen = HashSet::new();

    for id in order {
        if id.trim().is_empty() {
            return Err(ConfigError::validation("Preprocessor id cannot be blank"));
        }

        if !seen.insert(id.as_str()) {
            return Err(if id == PriorityOrder::DEFAULT_SLOT {
                ConfigError::validation(format!(
                    "Preprocessor order may contain '{}' at most once",
                    PriorityOrder::DEFAULT_SLOT
                ))
            } else {
                ConfigError::DuplicatePreprocessor(id.clone())
            });
        }
    }

    Ok(())
}
