use dor_gate::{Action, CallContext};
use dor_model::{BindingMap, DigitalObject, Disseminator, DisseminatorVersion};
use dor_types::{Pid, State, Timestamp};

use crate::error::{ManagementError, ManagementResult};
use crate::repository::Management;
use crate::request::{DisseminatorUpdate, NewDisseminator};

impl Management {
    /// Every binding must name a datastream of `object`.
    fn check_bindings(&self, object: &DigitalObject, map: &BindingMap) -> ManagementResult<()> {
        let target = self.config.default_binding_target.as_str();
        for binding in &map.bindings {
            let dsid = binding.resolved_datastream_id(target);
            if !object.has_datastream(dsid) {
                return Err(ManagementError::general(format!(
                    "binding {} refers to datastream {dsid}, which does not exist",
                    binding.bind_key
                )));
            }
        }
        Ok(())
    }

    fn check_contract(
        &self,
        object: &DigitalObject,
        bmech: &Pid,
        map: &BindingMap,
    ) -> ManagementResult<()> {
        let contract = self.contracts.resolve(bmech)?;
        contract
            .check(object, map, &self.config.default_binding_target)
            .map_err(|reason| {
                ManagementError::general(format!(
                    "binding map does not satisfy the contract of {bmech}: {reason}"
                ))
            })
    }

    /// Create a disseminator with one version. Returns its `DISS{n}` id.
    pub fn add_disseminator(
        &self,
        ctx: &CallContext,
        pid: &Pid,
        request: NewDisseminator,
    ) -> ManagementResult<String> {
        self.authorize(ctx, Action::AddDisseminator, Some(pid), None)?;
        let state = State::from_code(&request.state)?;

        let mut writer = self.open(pid)?;
        self.check_bindings(writer.object(), &request.binding_map)?;
        self.check_contract(writer.object(), &request.bmech_pid, &request.binding_map)?;

        let id = writer.object().next_disseminator_id("DISS");
        let now = Timestamp::now_after(writer.object().last_mod_date);
        let mut disseminator = Disseminator::new(id.clone(), request.bdef_pid);
        disseminator.state = state;
        disseminator.push_version(DisseminatorVersion {
            version_id: format!("{id}.0"),
            label: request.label,
            bmech_pid: request.bmech_pid,
            created: now,
            binding_map: request.binding_map,
        })?;
        writer.object_mut().put_disseminator(disseminator);

        self.finish(writer, ctx, Action::AddDisseminator, Some(&id), now, &request.log_message)?;
        Ok(id)
    }

    /// Append a disseminator version. Only the resulting binding map is
    /// checked against the mechanism contract, and not at all when forced.
    pub fn modify_disseminator(
        &self,
        ctx: &CallContext,
        pid: &Pid,
        dissid: &str,
        update: DisseminatorUpdate,
        force: bool,
    ) -> ManagementResult<Timestamp> {
        self.authorize(ctx, Action::ModifyDisseminator, Some(pid), Some(dissid))?;
        let state = update.state.as_deref().map(State::from_code).transpose()?;

        let mut writer = self.open(pid)?;
        let disseminator = existing_disseminator(writer.object(), pid, dissid)?;
        if disseminator.state == State::Deleted {
            return Err(ManagementError::general(format!(
                "disseminator {dissid} of {pid} is deleted and cannot be modified"
            )));
        }
        let current = disseminator.current().ok_or_else(|| {
            ManagementError::general(format!("disseminator {dissid} has no versions"))
        })?;

        let bmech_pid = update.bmech_pid.unwrap_or_else(|| current.bmech_pid.clone());
        let binding_map = update
            .binding_map
            .unwrap_or_else(|| current.binding_map.clone());
        self.check_bindings(writer.object(), &binding_map)?;
        if !force {
            self.check_contract(writer.object(), &bmech_pid, &binding_map)?;
        }

        let now = Timestamp::now_after(writer.object().last_mod_date.max(Some(current.created)));
        let version = DisseminatorVersion {
            version_id: disseminator.next_version_id(),
            label: update.label.unwrap_or_else(|| current.label.clone()),
            bmech_pid,
            created: now,
            binding_map,
        };

        let disseminator = writer
            .object_mut()
            .disseminator_mut(dissid)
            .ok_or_else(|| ManagementError::general(format!("disseminator {dissid} vanished")))?;
        if disseminator.versionable {
            disseminator.push_version(version)?;
        } else {
            disseminator.replace_with(version)?;
        }
        if let Some(state) = state {
            disseminator.state = state;
        }

        self.finish(
            writer,
            ctx,
            Action::ModifyDisseminator,
            Some(dissid),
            now,
            &update.log_message,
        )?;
        Ok(now)
    }

    /// Remove the versions of `dissid` created on or before `end` (all of
    /// them when `None`). Removing the last version removes the
    /// disseminator.
    pub fn purge_disseminator(
        &self,
        ctx: &CallContext,
        pid: &Pid,
        dissid: &str,
        end: Option<Timestamp>,
        log_message: &str,
    ) -> ManagementResult<Vec<Timestamp>> {
        self.authorize(ctx, Action::PurgeDisseminator, Some(pid), Some(dissid))?;
        let mut writer = self.open(pid)?;
        existing_disseminator(writer.object(), pid, dissid)?;

        let object = writer.object_mut();
        let (removed, emptied) = match object.disseminator_mut(dissid) {
            Some(d) => {
                let removed = d.purge_range(None, end);
                (removed, d.is_empty())
            }
            None => (Vec::new(), false),
        };
        if removed.is_empty() {
            return Err(ManagementError::general(format!(
                "no versions of disseminator {dissid} fall within the purge range"
            )));
        }
        if emptied {
            object.remove_disseminator(dissid)?;
        }
        let now = Timestamp::now_after(object.last_mod_date);
        self.finish(writer, ctx, Action::PurgeDisseminator, Some(dissid), now, log_message)?;
        Ok(removed)
    }

    pub fn set_disseminator_state(
        &self,
        ctx: &CallContext,
        pid: &Pid,
        dissid: &str,
        state: &str,
        log_message: &str,
    ) -> ManagementResult<Timestamp> {
        self.authorize(ctx, Action::SetDisseminatorState, Some(pid), Some(dissid))?;
        let state = State::from_code(state)?;
        let mut writer = self.open(pid)?;
        existing_disseminator(writer.object(), pid, dissid)?;
        let now = Timestamp::now_after(writer.object().last_mod_date);
        if let Some(d) = writer.object_mut().disseminator_mut(dissid) {
            d.state = state;
        }
        self.finish(writer, ctx, Action::SetDisseminatorState, Some(dissid), now, log_message)?;
        Ok(now)
    }
}

fn existing_disseminator<'a>(
    object: &'a DigitalObject,
    pid: &Pid,
    dissid: &str,
) -> ManagementResult<&'a Disseminator> {
    object.disseminator(dissid).ok_or_else(|| {
        ManagementError::general(format!("disseminator {dissid} not found on {pid}"))
    })
}
