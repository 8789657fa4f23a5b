use crate::prelude::*;
use bigdrive_common::manager::ApplicationManager;
use bigdrive_common::model::ApplicationConfiguration;

pub fn is_elevated() -> bool {
    uzers::get_effective_uid() == 0
}

pub fn installer_account_exists(user: &str) -> bool {
    uzers::get_user_by_name(user).is_some()
}

/// Warns when the account the service should run as is missing.
pub fn check_installer_account(user: &str) -> bool {
    let exists = installer_account_exists(user);
    if exists {
        println!("  User {user} exists.");
    } else {
        warn!("User {user} does not exist; create it before starting the service");
    }
    exists
}

/// Deletes and re-writes the service application so that it runs as `user`.
#[instrument(skip(applications))]
pub fn recreate_service_application(
    applications: &ApplicationManager,
    user: &str,
) -> ConfigurationResult<ApplicationConfiguration> {
    let application = ApplicationConfiguration::service(user);
    println!("  Deleting application: {}", application.name);
    applications.delete(application.id)?;
    applications.write(&application)?;
    println!(
        "  Application '{}' identity set to 'This User' ({user}).",
        application.name
    );
    Ok(application)
}
