// ABOUTME: Packs a build context directory into the tar body the build API expects.
// ABOUTME: Generated Dockerfiles are added as an extra entry under a reserved name.

use super::traits::{BuildRequest, DockerfileSource, GENERATED_DOCKERFILE};
use std::io;

/// Tar the request's context, appending the generated Dockerfile if there is one.
pub fn pack_context(request: &BuildRequest) -> io::Result<Vec<u8>> {
    let mut ar = tar::Builder::new(Vec::new());
    ar.follow_symlinks(false);
    ar.append_dir_all(".", &request.context)?;

    if let DockerfileSource::Generated(contents) = &request.dockerfile {
        let mut header = tar::Header::new_gnu();
        header.set_path(GENERATED_DOCKERFILE)?;
        header.set_size(contents.len() as u64);
        header.set_mode(0o644);
        header.set_cksum();
        ar.append(&header, contents.as_bytes())?;
    }

    ar.into_inner()
}
