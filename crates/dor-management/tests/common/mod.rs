//! Fixtures shared by the management integration tests.

#![allow(dead_code)]

use std::sync::Arc;

use dor_management::{CallContext, Management, RepositoryConfig, StaticFetcher};
use dor_types::Pid;

/// `demo:1` with a single inline `DC` datastream.
pub const DEMO: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<foxml:digitalObject VERSION="1.1" PID="demo:1"
    xmlns:foxml="info:fedora/fedora-system:def/foxml#">
  <foxml:objectProperties>
    <foxml:property NAME="info:fedora/fedora-system:def/model#state" VALUE="Active"/>
    <foxml:property NAME="info:fedora/fedora-system:def/model#label" VALUE="Demo"/>
  </foxml:objectProperties>
  <foxml:datastream ID="DC" STATE="A" CONTROL_GROUP="X" VERSIONABLE="true">
    <foxml:datastreamVersion ID="DC.0" LABEL="Dublin Core" CREATED="2023-11-14T22:13:20.000Z" MIMETYPE="text/xml">
      <foxml:xmlContent><dc>A</dc></foxml:xmlContent>
    </foxml:datastreamVersion>
  </foxml:datastream>
</foxml:digitalObject>"#;

/// `demo:2` whose disseminator binds `DC` implicitly through an empty
/// datastream id.
pub const IMPLICIT_BINDING: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<foxml:digitalObject VERSION="1.1" PID="demo:2"
    xmlns:foxml="info:fedora/fedora-system:def/foxml#">
  <foxml:objectProperties>
    <foxml:property NAME="info:fedora/fedora-system:def/model#state" VALUE="Active"/>
  </foxml:objectProperties>
  <foxml:datastream ID="DC" STATE="A" CONTROL_GROUP="X" VERSIONABLE="true">
    <foxml:datastreamVersion ID="DC.0" LABEL="Dublin Core" CREATED="2023-11-14T22:13:20.000Z" MIMETYPE="text/xml">
      <foxml:xmlContent><dc>B</dc></foxml:xmlContent>
    </foxml:datastreamVersion>
  </foxml:datastream>
  <foxml:disseminator ID="DISS1" BDEF_CONTRACT_PID="demo:bdef" STATE="A" VERSIONABLE="true">
    <foxml:disseminatorVersion ID="DISS1.0" BMECH_SERVICE_PID="demo:mech" CREATED="2023-11-14T22:13:21.000Z" LABEL="View">
      <foxml:serviceInputMap>
        <foxml:datastreamBinding KEY="SOURCE" DATASTREAM_ID="" LABEL="Source"/>
      </foxml:serviceInputMap>
    </foxml:disseminatorVersion>
  </foxml:disseminator>
</foxml:digitalObject>"#;

/// `demo:mech`, a mechanism whose contract takes exactly one XML
/// datastream under `SOURCE`.
pub const MECHANISM: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<foxml:digitalObject VERSION="1.1" PID="demo:mech"
    xmlns:foxml="info:fedora/fedora-system:def/foxml#">
  <foxml:objectProperties>
    <foxml:property NAME="info:fedora/fedora-system:def/model#state" VALUE="Active"/>
  </foxml:objectProperties>
  <foxml:datastream ID="DSINPUTSPEC" STATE="A" CONTROL_GROUP="X" VERSIONABLE="true">
    <foxml:datastreamVersion ID="DSINPUTSPEC.0" CREATED="2023-11-14T22:13:20.000Z" MIMETYPE="text/xml">
      <foxml:xmlContent>
        <fbs:DSInputSpec xmlns:fbs="http://fedora.comm.nsdlib.org/service/bindspec" label="XML viewer">
          <fbs:DSInput wsdlMsgPartName="SOURCE" DSMin="1" DSMax="1" DSOrdinality="false">
            <fbs:DSInputLabel>Source document</fbs:DSInputLabel>
            <fbs:DSMIME>text/xml</fbs:DSMIME>
          </fbs:DSInput>
        </fbs:DSInputSpec>
      </foxml:xmlContent>
    </foxml:datastreamVersion>
  </foxml:datastream>
</foxml:digitalObject>"#;

/// `demo:imgmech`, a mechanism whose contract takes exactly one PNG
/// datastream under `IMAGE`.
pub const IMAGE_MECHANISM: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<foxml:digitalObject VERSION="1.1" PID="demo:imgmech"
    xmlns:foxml="info:fedora/fedora-system:def/foxml#">
  <foxml:objectProperties>
    <foxml:property NAME="info:fedora/fedora-system:def/model#state" VALUE="Active"/>
  </foxml:objectProperties>
  <foxml:datastream ID="DSINPUTSPEC" STATE="A" CONTROL_GROUP="X" VERSIONABLE="true">
    <foxml:datastreamVersion ID="DSINPUTSPEC.0" CREATED="2023-11-14T22:13:20.000Z" MIMETYPE="text/xml">
      <foxml:xmlContent>
        <fbs:DSInputSpec xmlns:fbs="http://fedora.comm.nsdlib.org/service/bindspec" label="Image viewer">
          <fbs:DSInput wsdlMsgPartName="IMAGE" DSMin="1" DSMax="1" DSOrdinality="false">
            <fbs:DSInputLabel>Image</fbs:DSInputLabel>
            <fbs:DSMIME>image/png</fbs:DSMIME>
          </fbs:DSInput>
        </fbs:DSInputSpec>
      </foxml:xmlContent>
    </foxml:datastreamVersion>
  </foxml:datastream>
</foxml:digitalObject>"#;

pub const REMOTE_URL: &str = "http://example/x.txt";
pub const REMOTE_BYTES: &[u8] = b"remote text";

pub fn ctx() -> CallContext {
    CallContext::new("fedoraAdmin")
}

pub fn pid(s: &str) -> Pid {
    Pid::parse(s).unwrap()
}

/// An in-memory repository that can fetch [`REMOTE_URL`].
pub fn repo() -> Management {
    let fetcher = StaticFetcher::new().with(REMOTE_URL, REMOTE_BYTES);
    Management::in_memory(RepositoryConfig::default())
        .unwrap()
        .with_fetcher(Arc::new(fetcher))
}

pub fn ingest(repo: &Management, doc: &str) -> Pid {
    repo.ingest(&ctx(), &mut doc.as_bytes(), "foxml1.1", "UTF-8", "fixture")
        .unwrap()
}
