use crate::domain::movement::{MovementType, Validation, ValidatorRole};
use crate::domain::personnel::{Personnel, PersonnelRole};
use crate::errors::{NoValidatorReason, WorkflowError};
use crate::ports::PersonnelDirectory;

/// Which roles have to sign off a movement type, in order.
///
/// Every movement goes through the requester's service chief. Movements that need a
/// destination also go through HR. There is no admin step.
#[derive(Clone, Copy, Debug, Default)]
pub struct ChainPolicy;

impl ChainPolicy {
    pub fn required_roles(&self, movement_type: MovementType) -> Vec<ValidatorRole> {
        let mut roles = vec![ValidatorRole::ServiceChief];
        if movement_type.requires_destination() {
            roles.push(ValidatorRole::Hr);
        }
        roles
    }
}

/// One slot of a chain before it is resolved against the directory.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChainSlot {
    pub order: u32,
    pub role: ValidatorRole,
    pub service: String,
}

#[derive(Clone, Debug)]
pub struct ValidationChainBuilder {
    policy: ChainPolicy,
    hr_service: String,
}

impl ValidationChainBuilder {
    pub fn new(hr_service: impl Into<String>) -> Self {
        Self { policy: ChainPolicy, hr_service: hr_service.into() }
    }

    pub fn plan(&self, requester: &Personnel, movement_type: MovementType) -> Vec<ChainSlot> {
        self.policy
            .required_roles(movement_type)
            .into_iter()
            .zip(1u32..)
            .map(|(role, order)| ChainSlot {
                order,
                role,
                service: match role {
                    ValidatorRole::ServiceChief => requester.service.clone(),
                    ValidatorRole::Hr | ValidatorRole::Admin => self.hr_service.clone(),
                },
            })
            .collect()
    }

    /// Resolves every slot to an active validator. Fails on the first slot nobody can fill,
    /// including the case where the only candidate is the requester.
    pub async fn build<D>(
        &self,
        directory: &D,
        requester: &Personnel,
        movement_type: MovementType,
    ) -> Result<Vec<Validation>, WorkflowError>
    where
        D: PersonnelDirectory + ?Sized,
    {
        let mut chain = Vec::new();

        for slot in self.plan(requester, movement_type) {
            let candidate = directory
                .find_active_by_role_and_service(personnel_role(slot.role), &slot.service)
                .await?;

            let Some(validator) = candidate else {
                return Err(WorkflowError::NoValidator {
                    role: slot.role,
                    service: slot.service,
                    reason: NoValidatorReason::NotFound,
                });
            };
            if validator.id == requester.id {
                return Err(WorkflowError::NoValidator {
                    role: slot.role,
                    service: slot.service,
                    reason: NoValidatorReason::SelfApproval,
                });
            }

            chain.push(Validation::pending(validator.id, slot.role, slot.order));
        }

        Ok(chain)
    }
}

fn personnel_role(role: ValidatorRole) -> PersonnelRole {
    match role {
        ValidatorRole::ServiceChief => PersonnelRole::ServiceChief,
        ValidatorRole::Hr => PersonnelRole::Hr,
        ValidatorRole::Admin => PersonnelRole::Admin,
    }
}
